use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::entities::{city, location, ride_ticket, transport, vendor};
use crate::error::{AppError, AppResult};
use crate::handlers::crud;
use crate::utils::validation::{check_code, check_name, FieldErrors};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CityRequest {
    pub city_code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCityRequest {
    pub city_code: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationInfo {
    pub id: i32,
    pub location_code: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CityResponse {
    pub id: i32,
    pub city_code: String,
    pub name: String,
    pub locations: Vec<LocationInfo>,
}

fn to_response(c: city::Model, locations: &[location::Model]) -> CityResponse {
    CityResponse {
        id: c.id,
        city_code: c.city_code,
        name: c.name,
        locations: locations
            .iter()
            .filter(|l| l.city_id == c.id)
            .map(|l| LocationInfo {
                id: l.id,
                location_code: l.location_code.clone(),
                name: l.name.clone(),
            })
            .collect(),
    }
}

async fn load_city(state: &AppState, id: i32) -> AppResult<CityResponse> {
    let c = crud::find_or_404::<city::Entity>(&state.db, id, "City").await?;
    let locations = location::Entity::find()
        .filter(location::Column::CityId.eq(id))
        .order_by_asc(location::Column::Id)
        .all(&state.db)
        .await?;

    Ok(to_response(c, &locations))
}

async fn ensure_code_free(state: &AppState, code: &str, except: Option<i32>) -> AppResult<()> {
    let existing = city::Entity::find()
        .filter(city::Column::CityCode.eq(code))
        .one(&state.db)
        .await?;

    match existing {
        Some(c) if Some(c.id) != except => {
            Err(AppError::Conflict(format!("City ID {} already exists", code)))
        }
        _ => Ok(()),
    }
}

/// List all cities with their locations
pub async fn list_cities(State(state): State<AppState>) -> AppResult<Json<Vec<CityResponse>>> {
    let cities = crud::find_all::<city::Entity>(&state.db).await?;
    let locations = location::Entity::find()
        .order_by_asc(location::Column::Id)
        .all(&state.db)
        .await?;

    let responses = cities
        .into_iter()
        .map(|c| to_response(c, &locations))
        .collect();

    Ok(Json(responses))
}

pub async fn get_city(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<CityResponse>> {
    Ok(Json(load_city(&state, id).await?))
}

pub async fn create_city(
    State(state): State<AppState>,
    Json(payload): Json<CityRequest>,
) -> AppResult<Json<CityResponse>> {
    let mut errors = FieldErrors::new();
    check_code(&mut errors, "city_code", "City ID", &payload.city_code);
    check_name(&mut errors, "name", "City Name", &payload.name);
    errors.into_result(())?;

    let code = payload.city_code.trim();
    ensure_code_free(&state, code, None).await?;

    let created = city::ActiveModel {
        city_code: Set(code.to_string()),
        name: Set(payload.name.trim().to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(city_id = created.id, code = %created.city_code, "City created");
    Ok(Json(to_response(created, &[])))
}

pub async fn update_city(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCityRequest>,
) -> AppResult<Json<CityResponse>> {
    let existing = crud::find_or_404::<city::Entity>(&state.db, id, "City").await?;

    let mut errors = FieldErrors::new();
    if let Some(code) = &payload.city_code {
        check_code(&mut errors, "city_code", "City ID", code);
    }
    if let Some(name) = &payload.name {
        check_name(&mut errors, "name", "City Name", name);
    }
    errors.into_result(())?;

    let mut active: city::ActiveModel = existing.into();

    if let Some(code) = payload.city_code {
        let code = code.trim().to_string();
        ensure_code_free(&state, &code, Some(id)).await?;
        active.city_code = Set(code);
    }

    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }

    active.update(&state.db).await?;
    Ok(Json(load_city(&state, id).await?))
}

/// Delete a city; refused while anything still points at it
pub async fn delete_city(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<serde_json::Value>> {
    crud::find_or_404::<city::Entity>(&state.db, id, "City").await?;

    let locations = location::Entity::find()
        .filter(location::Column::CityId.eq(id))
        .count(&state.db)
        .await?;
    let vendors = vendor::Entity::find()
        .filter(vendor::Column::CityId.eq(id))
        .count(&state.db)
        .await?;
    let transports = transport::Entity::find()
        .filter(transport::Column::CityId.eq(id))
        .count(&state.db)
        .await?;

    let tickets = ride_ticket::Entity::find()
        .filter(ride_ticket::Column::CityId.eq(id))
        .count(&state.db)
        .await?;

    if locations + vendors + transports + tickets > 0 {
        return Err(AppError::Conflict(format!(
            "City is still in use by {} locations, {} vendors, {} transports and {} ride tickets",
            locations, vendors, transports, tickets
        )));
    }

    // The cost record goes with the city (cascade)
    crud::delete_or_404::<city::Entity>(&state.db, id, "City").await?;

    Ok(Json(serde_json::json!({ "message": "City deleted" })))
}

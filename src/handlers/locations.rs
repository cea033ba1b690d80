use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::cost_matrix::{MatrixMode, Reconciliation};
use crate::entities::{city, location, location_cost_detail, ride_ticket};
use crate::error::{AppError, AppResult};
use crate::handlers::crud;
use crate::handlers::location_costs::matrix_for_city;
use crate::utils::validation::{check_code, check_name, FieldErrors};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub location_code: String,
    pub name: String,
    pub city_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub location_code: Option<String>,
    pub name: Option<String>,
    pub city_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub id: i32,
    pub location_code: String,
    pub name: String,
    pub city_id: i32,
    pub city_name: String,
}

/// What the cost editor would show for the location's city after a save
#[derive(Debug, PartialEq, Serialize)]
pub struct CostMatrixSummary {
    pub mode: MatrixMode,
    pub row_count: usize,
    /// Rows still waiting for a price.
    pub unpriced: usize,
    pub location_cost_id: Option<i32>,
}

impl CostMatrixSummary {
    pub fn new(matrix: &Reconciliation, location_cost_id: Option<i32>) -> Self {
        Self {
            mode: matrix.mode,
            row_count: matrix.rows.len(),
            unpriced: matrix.rows.iter().filter(|r| !r.readonly).count(),
            location_cost_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateLocationResponse {
    pub location: LocationResponse,
    pub cost_matrix: CostMatrixSummary,
}

fn to_response(l: location::Model, cities: &[city::Model]) -> LocationResponse {
    let city_name = cities
        .iter()
        .find(|c| c.id == l.city_id)
        .map(|c| c.name.clone())
        .unwrap_or_default();

    LocationResponse {
        id: l.id,
        location_code: l.location_code,
        name: l.name,
        city_id: l.city_id,
        city_name,
    }
}

fn check_request(code: Option<&str>, name: Option<&str>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if let Some(code) = code {
        check_code(&mut errors, "location_code", "Location ID", code);
    }
    if let Some(name) = name {
        check_name(&mut errors, "name", "Location Name", name);
    }
    errors.into_result(())
}

async fn ensure_code_free(state: &AppState, code: &str, except: Option<i32>) -> AppResult<()> {
    let existing = location::Entity::find()
        .filter(location::Column::LocationCode.eq(code))
        .one(&state.db)
        .await?;

    match existing {
        Some(l) if Some(l.id) != except => {
            Err(AppError::Conflict(format!("Location ID {} already exists", code)))
        }
        _ => Ok(()),
    }
}

/// Cost details that mention the location as pickup or drop
async fn priced_pairs(state: &AppState, location_id: i32) -> AppResult<u64> {
    Ok(location_cost_detail::Entity::find()
        .filter(
            Condition::any()
                .add(location_cost_detail::Column::PickupLocationId.eq(location_id))
                .add(location_cost_detail::Column::DropLocationId.eq(location_id)),
        )
        .count(&state.db)
        .await?)
}

pub async fn list_locations(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LocationResponse>>> {
    let locations = crud::find_all::<location::Entity>(&state.db).await?;
    let cities = city::Entity::find().all(&state.db).await?;

    Ok(Json(
        locations
            .into_iter()
            .map(|l| to_response(l, &cities))
            .collect(),
    ))
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LocationResponse>> {
    let l = crud::find_or_404::<location::Entity>(&state.db, id, "Location").await?;
    let cities = city::Entity::find_by_id(l.city_id).all(&state.db).await?;

    Ok(Json(to_response(l, &cities)))
}

/// Create a location and report the state of its city's cost matrix
pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<LocationRequest>,
) -> AppResult<Json<CreateLocationResponse>> {
    check_request(Some(payload.location_code.as_str()), Some(payload.name.as_str()))?;

    let c = city::Entity::find_by_id(payload.city_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid city".to_string()))?;

    let code = payload.location_code.trim();
    ensure_code_free(&state, code, None).await?;

    let created = location::ActiveModel {
        location_code: Set(code.to_string()),
        name: Set(payload.name.trim().to_string()),
        city_id: Set(c.id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let (_, location_cost_id, matrix) = matrix_for_city(&state.db, c.id).await?;

    let summary = CostMatrixSummary::new(&matrix, location_cost_id);

    tracing::info!(
        location_id = created.id,
        city_id = c.id,
        matrix_mode = ?summary.mode,
        unpriced = summary.unpriced,
        "Location created"
    );

    Ok(Json(CreateLocationResponse {
        location: to_response(created, std::slice::from_ref(&c)),
        cost_matrix: summary,
    }))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateLocationRequest>,
) -> AppResult<Json<LocationResponse>> {
    let existing = crud::find_or_404::<location::Entity>(&state.db, id, "Location").await?;
    check_request(payload.location_code.as_deref(), payload.name.as_deref())?;

    let mut active: location::ActiveModel = existing.clone().into();

    if let Some(city_id) = payload.city_id.filter(|c| *c != existing.city_id) {
        city::Entity::find_by_id(city_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid city".to_string()))?;

        // Prices belong to pairs inside one city
        if priced_pairs(&state, id).await? > 0 {
            return Err(AppError::Conflict(
                "Location has prices in its city's cost matrix and cannot move to another city"
                    .to_string(),
            ));
        }
        active.city_id = Set(city_id);
    }

    if let Some(code) = payload.location_code {
        let code = code.trim().to_string();
        ensure_code_free(&state, &code, Some(id)).await?;
        active.location_code = Set(code);
    }

    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }

    let updated = active.update(&state.db).await?;
    let cities = city::Entity::find_by_id(updated.city_id).all(&state.db).await?;

    Ok(Json(to_response(updated, &cities)))
}

/// Delete a location along with every price that uses it
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<serde_json::Value>> {
    crud::find_or_404::<location::Entity>(&state.db, id, "Location").await?;

    let tickets = ride_ticket::Entity::find()
        .filter(
            Condition::any()
                .add(ride_ticket::Column::PickupLocationId.eq(id))
                .add(ride_ticket::Column::DropLocationId.eq(id)),
        )
        .count(&state.db)
        .await?;
    if tickets > 0 {
        return Err(AppError::Conflict(format!(
            "Location is used by {} ride tickets",
            tickets
        )));
    }

    let txn = state.db.begin().await?;

    let removed = location_cost_detail::Entity::delete_many()
        .filter(
            Condition::any()
                .add(location_cost_detail::Column::PickupLocationId.eq(id))
                .add(location_cost_detail::Column::DropLocationId.eq(id)),
        )
        .exec(&txn)
        .await?;

    let deleted = location::Entity::delete_by_id(id).exec(&txn).await?;
    if deleted.rows_affected == 0 {
        return Err(AppError::NotFound("Location not found".to_string()));
    }

    txn.commit().await?;

    tracing::info!(location_id = id, prices = removed.rows_affected, "Location deleted");

    Ok(Json(serde_json::json!({ "message": "Location deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_matrix::{reconcile, CityLocations, CostEntry, DirectedPair, LocationRef};

    fn city(count: i32) -> CityLocations {
        CityLocations {
            id: 7,
            name: "Pune".to_string(),
            locations: (1..=count)
                .map(|id| LocationRef { id, name: format!("Stop {}", id) })
                .collect(),
        }
    }

    #[test]
    fn test_summary_after_first_location() {
        let summary = CostMatrixSummary::new(&reconcile(&city(1), &[]), None);

        assert_eq!(
            summary,
            CostMatrixSummary {
                mode: MatrixMode::InsufficientLocations,
                row_count: 0,
                unpriced: 0,
                location_cost_id: None,
            }
        );
    }

    #[test]
    fn test_summary_after_adding_to_priced_city() {
        // Two stops priced both ways, then a third one added
        let stored = [
            CostEntry { pair: DirectedPair { pickup: 1, drop: 2 }, cost: 40.0 },
            CostEntry { pair: DirectedPair { pickup: 2, drop: 1 }, cost: 45.0 },
        ];

        let summary = CostMatrixSummary::new(&reconcile(&city(3), &stored), Some(11));

        assert_eq!(summary.mode, MatrixMode::Amend);
        assert_eq!(summary.row_count, 6);
        assert_eq!(summary.unpriced, 4);
        assert_eq!(summary.location_cost_id, Some(11));
    }
}

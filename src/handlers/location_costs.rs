use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::cost_matrix::{
    check_payload, plan_upsert, reconcile, CityLocations, CostDetailPayload, CostEntry,
    CostMatrixSession, CostRow, LocationCostPayload, LocationRef, MatrixMode, Reconciliation,
    RowEdit, SubmissionMode, SubmitRequest,
};
use crate::entities::{city, location, location_cost, location_cost_detail};
use crate::error::{AppError, AppResult};
use crate::handlers::crud;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySummary {
    pub id: i32,
    pub city_code: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDetailResponse {
    pub id: i32,
    pub pickup_location: LocationRef,
    pub drop_location: LocationRef,
    pub cost: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCostResponse {
    pub id: i32,
    pub city: CitySummary,
    pub locations: Vec<LocationRef>,
    pub location_cost_details: Vec<CostDetailResponse>,
}

#[derive(Debug, Serialize)]
pub struct CostMatrixResponse {
    pub city_id: i32,
    pub city_name: String,
    /// Present when the city already has a cost record; saves go to that record.
    pub location_cost_id: Option<i32>,
    pub mode: MatrixMode,
    pub rows: Vec<CostRow>,
}

/// Edits from the cost matrix editor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCostMatrixRequest {
    pub mode: SubmissionMode,
    pub rows: Vec<RowEdit>,
}

// ============ Loading ============

/// A city with its locations in insertion order.
pub async fn city_locations(db: &DatabaseConnection, city_id: i32) -> AppResult<CityLocations> {
    let city = crud::find_or_404::<city::Entity>(db, city_id, "City").await?;
    let locations = location::Entity::find()
        .filter(location::Column::CityId.eq(city_id))
        .order_by_asc(location::Column::Id)
        .all(db)
        .await?;

    Ok(CityLocations {
        id: city.id,
        name: city.name,
        locations: locations
            .into_iter()
            .map(|l| LocationRef { id: l.id, name: l.name })
            .collect(),
    })
}

/// The city's cost record, if any, with its details in insertion order.
pub async fn stored_costs(
    db: &DatabaseConnection,
    city_id: i32,
) -> AppResult<(Option<location_cost::Model>, Vec<location_cost_detail::Model>)> {
    let record = location_cost::Entity::find()
        .filter(location_cost::Column::CityId.eq(city_id))
        .one(db)
        .await?;

    let details = match &record {
        Some(r) => {
            location_cost_detail::Entity::find()
                .filter(location_cost_detail::Column::LocationCostId.eq(r.id))
                .order_by_asc(location_cost_detail::Column::Id)
                .all(db)
                .await?
        }
        None => Vec::new(),
    };

    Ok((record, details))
}

/// Reconciled matrix for a city, plus the id of the record it would be saved to.
pub async fn matrix_for_city(
    db: &DatabaseConnection,
    city_id: i32,
) -> AppResult<(CityLocations, Option<i32>, Reconciliation)> {
    let city = city_locations(db, city_id).await?;
    let (record, details) = stored_costs(db, city_id).await?;

    let existing: Vec<CostEntry> = details.iter().map(|d| d.entry()).collect();
    let result = reconcile(&city, &existing);

    Ok((city, record.map(|r| r.id), result))
}

fn to_response(
    record: &location_cost::Model,
    city: &city::Model,
    locations: &[LocationRef],
    details: Vec<location_cost_detail::Model>,
) -> LocationCostResponse {
    let lookup = |id: i32| {
        locations
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .unwrap_or(LocationRef { id, name: String::new() })
    };

    LocationCostResponse {
        id: record.id,
        city: CitySummary {
            id: city.id,
            city_code: city.city_code.clone(),
            name: city.name.clone(),
        },
        locations: locations.to_vec(),
        location_cost_details: details
            .into_iter()
            .map(|d| CostDetailResponse {
                id: d.id,
                pickup_location: lookup(d.pickup_location_id),
                drop_location: lookup(d.drop_location_id),
                cost: d.cost,
            })
            .collect(),
    }
}

async fn load_response(db: &DatabaseConnection, city_id: i32) -> AppResult<LocationCostResponse> {
    let city = crud::find_or_404::<city::Entity>(db, city_id, "City").await?;
    let locations = city_locations(db, city_id).await?.locations;
    let (record, details) = stored_costs(db, city_id).await?;
    let record = record
        .ok_or_else(|| AppError::NotFound("No location costs for this city".to_string()))?;

    Ok(to_response(&record, &city, &locations, details))
}

const RECORD_EXISTS: &str = "Location costs already exist for this city";
const DUPLICATE_PAIR: &str = "Duplicate pickup and drop combination";

fn detail_model(
    location_cost_id: i32,
    detail: &CostDetailPayload,
) -> location_cost_detail::ActiveModel {
    location_cost_detail::ActiveModel {
        location_cost_id: Set(location_cost_id),
        pickup_location_id: Set(detail.pickup_location),
        drop_location_id: Set(detail.drop_location),
        cost: Set(detail.cost),
        ..Default::default()
    }
}

/// Insert a city's cost record together with its first prices.
async fn insert_record(
    db: &DatabaseConnection,
    city_id: i32,
    payload: &LocationCostPayload,
) -> AppResult<location_cost::Model> {
    let txn = db.begin().await?;

    let existing = location_cost::Entity::find()
        .filter(location_cost::Column::CityId.eq(city_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(RECORD_EXISTS.to_string()));
    }

    // A concurrent create for the same city trips the unique index on city_id
    let record = location_cost::ActiveModel {
        city_id: Set(city_id),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::conflict_on_duplicate(e, RECORD_EXISTS))?;

    location_cost_detail::Entity::insert_many(
        payload
            .location_cost_details
            .iter()
            .map(|d| detail_model(record.id, d)),
    )
    .exec(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        city_id,
        location_cost_id = record.id,
        priced = payload.location_cost_details.len(),
        "Location costs created"
    );

    Ok(record)
}

/// Upsert the submitted prices into `record`; see [`plan_upsert`].
async fn upsert_record(
    db: &DatabaseConnection,
    record: location_cost::Model,
    payload: &LocationCostPayload,
) -> AppResult<location_cost::Model> {
    let txn = db.begin().await?;

    let stored: Vec<(i32, CostEntry)> = location_cost_detail::Entity::find()
        .filter(location_cost_detail::Column::LocationCostId.eq(record.id))
        .all(&txn)
        .await?
        .iter()
        .map(|d| (d.id, d.entry()))
        .collect();

    let plan = plan_upsert(&stored, &payload.location_cost_details);

    for (id, cost) in &plan.overwrites {
        location_cost_detail::ActiveModel {
            id: Set(*id),
            cost: Set(*cost),
            ..Default::default()
        }
        .update(&txn)
        .await?;
    }

    if !plan.inserts.is_empty() {
        location_cost_detail::Entity::insert_many(
            plan.inserts.iter().map(|d| detail_model(record.id, d)),
        )
        .exec(&txn)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, DUPLICATE_PAIR))?;
    }

    let mut active: location_cost::ActiveModel = record.into();
    active.updated_at = Set(Utc::now().into());
    let record = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        city_id = record.city_id,
        location_cost_id = record.id,
        inserted = plan.inserts.len(),
        overwritten = plan.overwrites.len(),
        unchanged = plan.unchanged,
        "Location costs updated"
    );

    Ok(record)
}

// ============ Handlers ============

/// Cost matrix for a city, ready to edit
pub async fn city_cost_matrix(
    State(state): State<AppState>,
    Path(city_id): Path<i32>,
) -> AppResult<Json<CostMatrixResponse>> {
    let (city, location_cost_id, result) = matrix_for_city(&state.db, city_id).await?;

    Ok(Json(CostMatrixResponse {
        city_id: city.id,
        city_name: city.name,
        location_cost_id,
        mode: result.mode,
        rows: result.rows,
    }))
}

/// List every city's cost record
pub async fn list_location_costs(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LocationCostResponse>>> {
    let records = crud::find_all::<location_cost::Entity>(&state.db).await?;
    let cities = city::Entity::find().all(&state.db).await?;
    let locations = location::Entity::find()
        .order_by_asc(location::Column::Id)
        .all(&state.db)
        .await?;
    let details = location_cost_detail::Entity::find()
        .order_by_asc(location_cost_detail::Column::Id)
        .all(&state.db)
        .await?;

    let mut locations_by_city: HashMap<i32, Vec<LocationRef>> = HashMap::new();
    for l in locations {
        locations_by_city
            .entry(l.city_id)
            .or_default()
            .push(LocationRef { id: l.id, name: l.name });
    }

    let mut details_by_record: HashMap<i32, Vec<location_cost_detail::Model>> = HashMap::new();
    for d in details {
        details_by_record.entry(d.location_cost_id).or_default().push(d);
    }

    let responses = records
        .iter()
        .filter_map(|record| {
            let city = cities.iter().find(|c| c.id == record.city_id)?;
            let locations = locations_by_city
                .get(&city.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let details = details_by_record.remove(&record.id).unwrap_or_default();
            Some(to_response(record, city, locations, details))
        })
        .collect();

    Ok(Json(responses))
}

/// Stored costs for one city
pub async fn get_city_location_costs(
    State(state): State<AppState>,
    Path(city_id): Path<i32>,
) -> AppResult<Json<LocationCostResponse>> {
    Ok(Json(load_response(&state.db, city_id).await?))
}

/// Create the cost record for a city
pub async fn create_location_cost(
    State(state): State<AppState>,
    Json(payload): Json<LocationCostPayload>,
) -> AppResult<Json<LocationCostResponse>> {
    let city = city_locations(&state.db, payload.city).await?;
    check_payload(&city, &payload)?;

    insert_record(&state.db, city.id, &payload).await?;

    Ok(Json(load_response(&state.db, city.id).await?))
}

/// Write the submitted prices into an existing cost record.
///
/// Submitted pairs are inserted or overwritten; pairs not in the body keep their stored cost.
pub async fn update_location_cost(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<LocationCostPayload>,
) -> AppResult<Json<LocationCostResponse>> {
    let record = crud::find_or_404::<location_cost::Entity>(&state.db, id, "Location cost").await?;

    if payload.city != record.city_id {
        return Err(AppError::BadRequest(
            "City cannot be changed on a location cost record".to_string(),
        ));
    }

    let city = city_locations(&state.db, record.city_id).await?;
    check_payload(&city, &payload)?;

    let record = upsert_record(&state.db, record, &payload).await?;

    Ok(Json(load_response(&state.db, record.city_id).await?))
}

/// Save what was typed into a city's cost matrix.
///
/// The matrix is derived again from the stored prices, so which rows are locked does not depend
/// on the caller. Row errors come back keyed `locationCosts.{row}.cost`.
pub async fn save_cost_matrix(
    State(state): State<AppState>,
    Path(city_id): Path<i32>,
    Json(payload): Json<SaveCostMatrixRequest>,
) -> AppResult<Json<LocationCostResponse>> {
    let city = city_locations(&state.db, city_id).await?;
    let (record, details) = stored_costs(&state.db, city_id).await?;
    let existing: Vec<CostEntry> = details.iter().map(|d| d.entry()).collect();

    let mut session = CostMatrixSession::new(payload.mode);
    session.select_city(city.clone());
    session.apply_costs(city.id, record.map(|r| r.id), &existing);
    session.apply_edits(&payload.rows)?;

    match session.submit()? {
        SubmitRequest::Create(body) => {
            check_payload(&city, &body)?;
            insert_record(&state.db, city.id, &body).await?;
        }
        SubmitRequest::Update { id, payload: body } => {
            check_payload(&city, &body)?;
            let record =
                crud::find_or_404::<location_cost::Entity>(&state.db, id, "Location cost").await?;
            upsert_record(&state.db, record, &body).await?;
        }
    }

    Ok(Json(load_response(&state.db, city.id).await?))
}

/// Delete a city's cost record and all its prices
pub async fn delete_location_cost(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<serde_json::Value>> {
    crud::delete_or_404::<location_cost::Entity>(&state.db, id, "Location cost").await?;

    Ok(Json(serde_json::json!({ "message": "Location cost deleted" })))
}

use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;

use crate::entities::{city, transport, vendor};
use crate::error::{AppError, AppResult};
use crate::handlers::crud::{self, Resource};
use crate::utils::validation::{check_email, check_required, FieldErrors};
use crate::AppState;

pub const MAX_SEATER: i32 = 20;

pub struct Transports;

impl Resource for Transports {
    type Entity = transport::Entity;
    const LABEL: &'static str = "Transport";
}

#[derive(Debug, Deserialize)]
pub struct TransportRequest {
    pub transport_code: String,
    pub vehicle_no: String,
    pub owner_details: String,
    pub contact: String,
    pub email: String,
    pub transport_type: String,
    pub seater: i32,
    pub vendor_id: i32,
    pub city_id: i32,
}

fn check_request(payload: &TransportRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_required(&mut errors, "transport_code", "Transport ID", &payload.transport_code);
    check_required(&mut errors, "vehicle_no", "Vehicle Number", &payload.vehicle_no);
    check_required(&mut errors, "owner_details", "Owner Details", &payload.owner_details);
    check_required(&mut errors, "contact", "Contact", &payload.contact);
    check_email(&mut errors, "email", &payload.email);
    check_required(&mut errors, "transport_type", "Type", &payload.transport_type);
    if payload.seater < 1 {
        errors.add("seater", "Seater is required");
    } else if payload.seater > MAX_SEATER {
        errors.add("seater", format!("Seater must be less than {}", MAX_SEATER));
    }
    errors.into_result(())
}

async fn check_references(
    state: &AppState,
    payload: &TransportRequest,
    except: Option<i32>,
) -> AppResult<()> {
    city::Entity::find_by_id(payload.city_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid city".to_string()))?;
    vendor::Entity::find_by_id(payload.vendor_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid vendor".to_string()))?;

    let clash = transport::Entity::find()
        .filter(transport::Column::TransportCode.eq(payload.transport_code.trim()))
        .one(&state.db)
        .await?;
    match clash {
        Some(t) if Some(t.id) != except => Err(AppError::Conflict(format!(
            "Transport ID {} already exists",
            t.transport_code
        ))),
        _ => Ok(()),
    }
}

fn apply(active: &mut transport::ActiveModel, payload: TransportRequest) {
    active.transport_code = Set(payload.transport_code.trim().to_string());
    active.vehicle_no = Set(payload.vehicle_no.trim().to_string());
    active.owner_details = Set(payload.owner_details.trim().to_string());
    active.contact = Set(payload.contact.trim().to_string());
    active.email = Set(payload.email.trim().to_string());
    active.transport_type = Set(payload.transport_type.trim().to_string());
    active.seater = Set(payload.seater);
    active.vendor_id = Set(payload.vendor_id);
    active.city_id = Set(payload.city_id);
}

pub async fn create_transport(
    State(state): State<AppState>,
    Json(payload): Json<TransportRequest>,
) -> AppResult<Json<transport::Model>> {
    check_request(&payload)?;
    check_references(&state, &payload, None).await?;

    let mut active = <transport::ActiveModel as Default>::default();
    apply(&mut active, payload);
    let created = active.insert(&state.db).await?;

    tracing::info!(
        transport_id = created.id,
        vendor_id = created.vendor_id,
        "Transport created"
    );
    Ok(Json(created))
}

pub async fn update_transport(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<TransportRequest>,
) -> AppResult<Json<transport::Model>> {
    let existing = crud::find_or_404::<transport::Entity>(&state.db, id, Transports::LABEL).await?;
    check_request(&payload)?;
    check_references(&state, &payload, Some(id)).await?;

    let mut active: transport::ActiveModel = existing.into();
    apply(&mut active, payload);

    Ok(Json(active.update(&state.db).await?))
}

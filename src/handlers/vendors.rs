use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;

use crate::entities::{city, vendor};
use crate::error::{AppError, AppResult};
use crate::handlers::crud::{self, Resource};
use crate::utils::validation::{check_email, check_mobile, check_required, FieldErrors};
use crate::AppState;

pub struct Vendors;

impl Resource for Vendors {
    type Entity = vendor::Entity;
    const LABEL: &'static str = "Vendor";
}

#[derive(Debug, Deserialize)]
pub struct VendorRequest {
    pub vendor_code: String,
    pub name: String,
    pub city_id: i32,
    pub address: String,
    pub email: String,
    pub mobile: String,
}

fn check_request(payload: &VendorRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_required(&mut errors, "vendor_code", "Vendor ID", &payload.vendor_code);
    check_required(&mut errors, "name", "Vendor Name", &payload.name);
    check_required(&mut errors, "address", "Address", &payload.address);
    check_email(&mut errors, "email", &payload.email);
    check_mobile(&mut errors, "mobile", &payload.mobile);
    errors.into_result(())
}

async fn check_references(state: &AppState, payload: &VendorRequest, except: Option<i32>) -> AppResult<()> {
    city::Entity::find_by_id(payload.city_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid city".to_string()))?;

    let clash = vendor::Entity::find()
        .filter(vendor::Column::VendorCode.eq(payload.vendor_code.trim()))
        .one(&state.db)
        .await?;
    match clash {
        Some(v) if Some(v.id) != except => Err(AppError::Conflict(format!(
            "Vendor ID {} already exists",
            v.vendor_code
        ))),
        _ => Ok(()),
    }
}

pub async fn create_vendor(
    State(state): State<AppState>,
    Json(payload): Json<VendorRequest>,
) -> AppResult<Json<vendor::Model>> {
    check_request(&payload)?;
    check_references(&state, &payload, None).await?;

    let created = vendor::ActiveModel {
        vendor_code: Set(payload.vendor_code.trim().to_string()),
        name: Set(payload.name.trim().to_string()),
        city_id: Set(payload.city_id),
        address: Set(payload.address.trim().to_string()),
        email: Set(payload.email.trim().to_string()),
        mobile: Set(payload.mobile.trim().to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(vendor_id = created.id, city_id = created.city_id, "Vendor created");
    Ok(Json(created))
}

/// Replace a vendor's details
pub async fn update_vendor(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<VendorRequest>,
) -> AppResult<Json<vendor::Model>> {
    let existing = crud::find_or_404::<vendor::Entity>(&state.db, id, Vendors::LABEL).await?;
    check_request(&payload)?;
    check_references(&state, &payload, Some(id)).await?;

    let mut active: vendor::ActiveModel = existing.into();
    active.vendor_code = Set(payload.vendor_code.trim().to_string());
    active.name = Set(payload.name.trim().to_string());
    active.city_id = Set(payload.city_id);
    active.address = Set(payload.address.trim().to_string());
    active.email = Set(payload.email.trim().to_string());
    active.mobile = Set(payload.mobile.trim().to_string());

    Ok(Json(active.update(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> VendorRequest {
        VendorRequest {
            vendor_code: "V01".to_string(),
            name: "City Cabs".to_string(),
            city_id: 1,
            address: "12 Ring Road".to_string(),
            email: "desk@citycabs.in".to_string(),
            mobile: "9876543210".to_string(),
        }
    }

    #[test]
    fn test_valid_vendor_passes() {
        assert!(check_request(&request()).is_ok());
    }

    #[test]
    fn test_vendor_errors_are_keyed_by_field() {
        let mut payload = request();
        payload.address = "  ".to_string();
        payload.mobile = "12ab".to_string();

        let errors = check_request(&payload).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.get("address").is_some());
        assert!(errors.get("mobile").is_some());
        assert!(errors.get("email").is_none());
    }
}

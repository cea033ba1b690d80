use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryTrait};
use serde::Serialize;

use crate::access::can_view_dashboard;
use crate::entities::{city, location, ride_ticket, transport, user, vendor};
use crate::error::{AppError, AppResult};
use crate::rides::report::{summarize, DashboardFilter, RideFacts, RideStats};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub city_count: u64,
    pub location_count: u64,
    pub user_count: u64,
    pub transport_count: u64,
    pub vendor_count: u64,
    #[serde(flatten)]
    pub rides: RideStats,
}

/// Master-data counts and ride figures, narrowed by the optional filters
pub async fn dashboard_data(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<DashboardFilter>,
) -> AppResult<Json<DashboardResponse>> {
    if !can_view_dashboard(claims.role) {
        return Err(AppError::Forbidden("Dashboard access required".to_string()));
    }
    filter.validate()?;

    let db = &state.db;

    let city_count = city::Entity::find()
        .apply_if(filter.city_id, |q, id| q.filter(city::Column::Id.eq(id)))
        .count(db)
        .await?;
    let location_count = location::Entity::find()
        .apply_if(filter.city_id, |q, id| q.filter(location::Column::CityId.eq(id)))
        .apply_if(filter.location_id, |q, id| q.filter(location::Column::Id.eq(id)))
        .count(db)
        .await?;
    let vendor_count = vendor::Entity::find()
        .apply_if(filter.city_id, |q, id| q.filter(vendor::Column::CityId.eq(id)))
        .apply_if(filter.vendor_id, |q, id| q.filter(vendor::Column::Id.eq(id)))
        .count(db)
        .await?;
    let transport_count = transport::Entity::find()
        .apply_if(filter.city_id, |q, id| q.filter(transport::Column::CityId.eq(id)))
        .apply_if(filter.vendor_id, |q, id| q.filter(transport::Column::VendorId.eq(id)))
        .count(db)
        .await?;
    let user_count = user::Entity::find().count(db).await?;

    let cities: HashMap<i32, String> = city::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let locations: HashMap<i32, String> = location::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|l| (l.id, l.name))
        .collect();
    let vendor_of: HashMap<i32, i32> = transport::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.vendor_id))
        .collect();

    let rides: Vec<RideFacts> = ride_ticket::Entity::find()
        .apply_if(filter.city_id, |q, id| q.filter(ride_ticket::Column::CityId.eq(id)))
        .all(db)
        .await?
        .into_iter()
        .map(|t| RideFacts {
            city_id: t.city_id,
            city_name: cities.get(&t.city_id).cloned().unwrap_or_default(),
            pickup_location_id: t.pickup_location_id,
            pickup_location_name: locations
                .get(&t.pickup_location_id)
                .cloned()
                .unwrap_or_default(),
            vendor_id: t.transport_id.and_then(|id| vendor_of.get(&id).copied()),
            status: t.status,
            pickup_date: t.pickup_date,
            cost: t.cost,
        })
        .collect();

    Ok(Json(DashboardResponse {
        city_count,
        location_count,
        user_count,
        transport_count,
        vendor_count,
        rides: summarize(&filter, &rides),
    }))
}

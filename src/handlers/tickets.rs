use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::can_operate_rides;
use crate::cost_matrix::{CostEntry, LocationRef};
use crate::entities::ride_ticket::{self, TicketStatus};
use crate::entities::user::UserRole;
use crate::entities::{city, location, transport, user};
use crate::error::{AppError, AppResult};
use crate::handlers::crud;
use crate::handlers::location_costs::{city_locations, stored_costs};
use crate::rides::{self, check_drop, check_new_ticket, check_otp, IssuedOtp, RideError};
use crate::utils::jwt::Claims;
use crate::utils::validation::FieldErrors;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub city: i32,
    pub pickup_location: i32,
    pub drop_location: Option<i32>,
    pub transport: Option<i32>,
    pub pickup_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct MyTicketsQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpQuery {
    pub otp: String,
    pub drop_location: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRemarksQuery {
    pub remarks: Option<String>,
    pub drop_location: Option<i32>,
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportInfo {
    pub id: i32,
    pub vehicle_no: String,
    pub owner_details: String,
    pub contact: String,
    pub transport_type: String,
    pub vendor_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: i32,
    pub user_id: Uuid,
    pub user_name: String,
    pub email: String,
    pub city: LocationRef,
    pub pickup_location: LocationRef,
    pub drop_location: Option<LocationRef>,
    pub transport: Option<TransportInfo>,
    pub pickup_date: NaiveDate,
    pub status: TicketStatus,
    pub cost: Option<f64>,
    pub remarks: Option<String>,
    pub created_role: UserRole,
    pub ride_start_time: Option<DateTime<Utc>>,
    pub ride_end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSentResponse {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Names needed to render tickets, loaded once per request.
struct Directory {
    users: HashMap<Uuid, user::Model>,
    cities: HashMap<i32, city::Model>,
    locations: HashMap<i32, location::Model>,
    transports: HashMap<i32, transport::Model>,
}

impl Directory {
    async fn load(db: &DatabaseConnection) -> AppResult<Self> {
        Ok(Self {
            users: user::Entity::find()
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect(),
            cities: city::Entity::find()
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect(),
            locations: location::Entity::find()
                .all(db)
                .await?
                .into_iter()
                .map(|l| (l.id, l))
                .collect(),
            transports: transport::Entity::find()
                .all(db)
                .await?
                .into_iter()
                .map(|t| (t.id, t))
                .collect(),
        })
    }

    fn location(&self, id: i32) -> LocationRef {
        LocationRef {
            id,
            name: self
                .locations
                .get(&id)
                .map(|l| l.name.clone())
                .unwrap_or_default(),
        }
    }

    fn to_response(&self, t: ride_ticket::Model) -> TicketResponse {
        let rider = self.users.get(&t.user_id);

        TicketResponse {
            id: t.id,
            user_id: t.user_id,
            user_name: rider.map(|u| u.name.clone()).unwrap_or_default(),
            email: rider.map(|u| u.email.clone()).unwrap_or_default(),
            city: LocationRef {
                id: t.city_id,
                name: self
                    .cities
                    .get(&t.city_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
            },
            pickup_location: self.location(t.pickup_location_id),
            drop_location: t.drop_location_id.map(|id| self.location(id)),
            transport: t
                .transport_id
                .and_then(|id| self.transports.get(&id))
                .map(|tr| TransportInfo {
                    id: tr.id,
                    vehicle_no: tr.vehicle_no.clone(),
                    owner_details: tr.owner_details.clone(),
                    contact: tr.contact.clone(),
                    transport_type: tr.transport_type.clone(),
                    vendor_id: tr.vendor_id,
                }),
            pickup_date: t.pickup_date,
            status: t.status,
            cost: t.cost,
            remarks: t.remarks,
            created_role: t.created_role,
            ride_start_time: t.ride_start_time.map(|d| d.with_timezone(&Utc)),
            ride_end_time: t.ride_end_time.map(|d| d.with_timezone(&Utc)),
            created_at: t.created_at.with_timezone(&Utc),
        }
    }
}

fn field_error(field: &str, message: &str) -> AppError {
    let mut errors = FieldErrors::new();
    errors.add(field, message);
    AppError::Validation(errors)
}

fn require_operator(claims: &Claims) -> AppResult<()> {
    if can_operate_rides(claims.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Ride operations access required".to_string()))
    }
}

fn issued_otp(ticket: &ride_ticket::Model) -> Option<IssuedOtp> {
    ticket
        .otp
        .clone()
        .zip(ticket.otp_expires_at)
        .map(|(code, expires_at)| IssuedOtp {
            code,
            expires_at: expires_at.with_timezone(&Utc),
        })
}

/// Price of the ride from the city's matrix, when the pair is priced.
async fn fare_for(
    db: &DatabaseConnection,
    city_id: i32,
    pickup: i32,
    drop: Option<i32>,
) -> AppResult<Option<f64>> {
    let Some(drop) = drop else {
        return Ok(None);
    };
    let (_, details) = stored_costs(db, city_id).await?;
    let costs: Vec<CostEntry> = details.iter().map(|d| d.entry()).collect();

    Ok(rides::fare(&costs, pickup, drop))
}

async fn load_response(
    db: &DatabaseConnection,
    ticket: ride_ticket::Model,
) -> AppResult<TicketResponse> {
    Ok(Directory::load(db).await?.to_response(ticket))
}

/// Book a ride for the caller
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTicketRequest>,
) -> AppResult<Json<TicketResponse>> {
    let city = city_locations(&state.db, payload.city)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => field_error("city", "Invalid city"),
            other => other,
        })?;

    let ticket = check_new_ticket(
        &city,
        payload.pickup_location,
        payload.drop_location,
        payload.pickup_date,
        Utc::now().date_naive(),
    )?;

    if let Some(transport_id) = payload.transport {
        let in_city = transport::Entity::find_by_id(transport_id)
            .one(&state.db)
            .await?
            .is_some_and(|t| t.city_id == city.id);
        if !in_city {
            return Err(field_error("transport", "Invalid transport"));
        }
    }

    let open = ride_ticket::Entity::find()
        .filter(ride_ticket::Column::UserId.eq(claims.sub))
        .filter(ride_ticket::Column::Status.ne(TicketStatus::Completed))
        .one(&state.db)
        .await?;
    if open.is_some() {
        return Err(AppError::Conflict(
            "You already have an open ride ticket".to_string(),
        ));
    }

    let cost = fare_for(&state.db, city.id, ticket.pickup, ticket.drop).await?;

    let created = ride_ticket::ActiveModel {
        user_id: Set(claims.sub),
        city_id: Set(city.id),
        pickup_location_id: Set(ticket.pickup),
        drop_location_id: Set(ticket.drop),
        transport_id: Set(payload.transport),
        pickup_date: Set(ticket.pickup_date),
        status: Set(TicketStatus::Pending),
        otp: Set(None),
        otp_expires_at: Set(None),
        cost: Set(cost),
        remarks: Set(None),
        created_role: Set(claims.role),
        ride_start_time: Set(None),
        ride_end_time: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(
        ticket_id = created.id,
        user_id = %claims.sub,
        city_id = city.id,
        "Ride ticket created"
    );

    Ok(Json(load_response(&state.db, created).await?))
}

/// The caller's tickets; ride operators see every ticket
pub async fn my_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MyTicketsQuery>,
) -> AppResult<Json<Vec<TicketResponse>>> {
    let mut select = ride_ticket::Entity::find().order_by_desc(ride_ticket::Column::CreatedAt);
    if !can_operate_rides(claims.role) {
        select = select.filter(ride_ticket::Column::UserId.eq(claims.sub));
    }
    let tickets = select.all(&state.db).await?;
    let directory = Directory::load(&state.db).await?;

    let responses = tickets
        .into_iter()
        .map(|t| directory.to_response(t))
        .filter(|t| {
            let status = t.status.to_string();
            let drop = t.drop_location.as_ref().map(|l| l.name.as_str()).unwrap_or_default();
            let vehicle = t.transport.as_ref().map(|tr| tr.vehicle_no.as_str()).unwrap_or_default();
            rides::matches_search(
                query.search.as_deref(),
                &[
                    t.user_name.as_str(),
                    t.email.as_str(),
                    t.city.name.as_str(),
                    t.pickup_location.name.as_str(),
                    drop,
                    vehicle,
                    status.as_str(),
                ],
            )
        })
        .collect();

    Ok(Json(responses))
}

/// Issue a one-time code for the rider to read back at pickup.
///
/// Codes go to the `ride_dispatch_backend::otp` log target for delivery.
pub async fn send_otp(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> AppResult<Json<OtpSentResponse>> {
    require_operator(&claims)?;

    let ticket = crud::find_or_404::<ride_ticket::Entity>(&state.db, id, "Ride ticket").await?;
    ticket.status.can_send_otp()?;

    let otp = rides::issue_otp(&mut rand::thread_rng(), Utc::now());

    let rider = user::Entity::find_by_id(ticket.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Rider not found".to_string()))?;

    let mut active: ride_ticket::ActiveModel = ticket.into();
    active.otp = Set(Some(otp.code.clone()));
    active.otp_expires_at = Set(Some(otp.expires_at.into()));
    active.update(&state.db).await?;

    tracing::info!(
        target: "ride_dispatch_backend::otp",
        ticket_id = id,
        email = %rider.email,
        code = %otp.code,
        "OTP issued"
    );

    Ok(Json(OtpSentResponse {
        message: "OTP sent successfully".to_string(),
        expires_at: otp.expires_at,
    }))
}

/// Start the ride once the rider's code matches
pub async fn verify_otp(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Query(query): Query<VerifyOtpQuery>,
) -> AppResult<Json<TicketResponse>> {
    require_operator(&claims)?;

    let ticket = crud::find_or_404::<ride_ticket::Entity>(&state.db, id, "Ride ticket").await?;
    let next = ticket.status.start()?;
    let now = Utc::now();
    check_otp(issued_otp(&ticket).as_ref(), &query.otp, now)?;

    let drop = match query.drop_location {
        Some(drop) => {
            let city = city_locations(&state.db, ticket.city_id).await?;
            Some(check_drop(&city, ticket.pickup_location_id, drop)?)
        }
        None => ticket.drop_location_id,
    };
    let cost = fare_for(&state.db, ticket.city_id, ticket.pickup_location_id, drop).await?;

    let mut active: ride_ticket::ActiveModel = ticket.into();
    active.status = Set(next);
    active.otp = Set(None);
    active.otp_expires_at = Set(None);
    active.drop_location_id = Set(drop);
    active.cost = Set(cost);
    active.ride_start_time = Set(Some(now.into()));
    let updated = active.update(&state.db).await?;

    tracing::info!(ticket_id = id, operator = %claims.sub, "Ride started");

    Ok(Json(load_response(&state.db, updated).await?))
}

/// End the ride with the operator's remarks
pub async fn update_remarks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Query(query): Query<UpdateRemarksQuery>,
) -> AppResult<Json<TicketResponse>> {
    require_operator(&claims)?;

    if query.status.is_some_and(|s| s != TicketStatus::Completed) {
        return Err(AppError::BadRequest(
            "Remarks can only be saved when completing a ride".to_string(),
        ));
    }

    let ticket = crud::find_or_404::<ride_ticket::Entity>(&state.db, id, "Ride ticket").await?;
    let next = ticket.status.complete()?;

    let drop = match query.drop_location {
        Some(drop) => {
            let city = city_locations(&state.db, ticket.city_id).await?;
            check_drop(&city, ticket.pickup_location_id, drop)?
        }
        None => ticket.drop_location_id.ok_or(RideError::DropRequired)?,
    };
    let cost = fare_for(&state.db, ticket.city_id, ticket.pickup_location_id, Some(drop)).await?;
    let remarks = query
        .remarks
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .or_else(|| ticket.remarks.clone());

    let mut active: ride_ticket::ActiveModel = ticket.into();
    active.status = Set(next);
    active.drop_location_id = Set(Some(drop));
    active.cost = Set(cost);
    active.remarks = Set(remarks);
    active.ride_end_time = Set(Some(Utc::now().into()));
    let updated = active.update(&state.db).await?;

    tracing::info!(ticket_id = id, operator = %claims.sub, fare = ?updated.cost, "Ride completed");

    Ok(Json(load_response(&state.db, updated).await?))
}

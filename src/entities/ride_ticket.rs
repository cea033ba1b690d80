use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::user::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ticket_status")]
pub enum TicketStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "ride_started")]
    #[serde(rename = "Ride Started")]
    RideStarted,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TicketStatus::Pending => "Pending",
            TicketStatus::RideStarted => "Ride Started",
            TicketStatus::Completed => "Completed",
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ride_ticket")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Uuid,
    pub city_id: i32,
    pub pickup_location_id: i32,
    pub drop_location_id: Option<i32>,
    pub transport_id: Option<i32>,
    pub pickup_date: Date,
    pub status: TicketStatus,
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTimeWithTimeZone>,
    pub cost: Option<f64>,
    pub remarks: Option<String>,
    pub created_role: UserRole,
    pub ride_start_time: Option<DateTimeWithTimeZone>,
    pub ride_end_time: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::city::Entity",
        from = "Column::CityId",
        to = "super::city::Column::Id"
    )]
    City,
    #[sea_orm(
        belongs_to = "super::transport::Entity",
        from = "Column::TransportId",
        to = "super::transport::Column::Id"
    )]
    Transport,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::transport::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transport.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

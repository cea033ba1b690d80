use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20251101_000001_create_cities::City;
use super::m20251101_000002_create_users::{User, UserRole};
use super::m20251101_000003_create_locations::Location;
use super::m20251101_000006_create_transports::Transport;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(TicketStatus::Enum)
                    .values([
                        TicketStatus::Pending,
                        TicketStatus::RideStarted,
                        TicketStatus::Completed,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RideTicket::Table)
                    .if_not_exists()
                    .col(pk_auto(RideTicket::Id))
                    .col(uuid(RideTicket::UserId).not_null())
                    .col(integer(RideTicket::CityId).not_null())
                    .col(integer(RideTicket::PickupLocationId).not_null())
                    .col(integer_null(RideTicket::DropLocationId))
                    .col(integer_null(RideTicket::TransportId))
                    .col(date(RideTicket::PickupDate).not_null())
                    .col(
                        ColumnDef::new(RideTicket::Status)
                            .custom(TicketStatus::Enum)
                            .not_null(),
                    )
                    .col(string_len_null(RideTicket::Otp, 10))
                    .col(timestamp_with_time_zone_null(RideTicket::OtpExpiresAt))
                    .col(double_null(RideTicket::Cost))
                    .col(text_null(RideTicket::Remarks))
                    .col(
                        ColumnDef::new(RideTicket::CreatedRole)
                            .custom(UserRole::Enum)
                            .not_null(),
                    )
                    .col(timestamp_with_time_zone_null(RideTicket::RideStartTime))
                    .col(timestamp_with_time_zone_null(RideTicket::RideEndTime))
                    .col(
                        timestamp_with_time_zone(RideTicket::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_ticket_user")
                            .from(RideTicket::Table, RideTicket::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_ticket_city")
                            .from(RideTicket::Table, RideTicket::CityId)
                            .to(City::Table, City::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_ticket_pickup")
                            .from(RideTicket::Table, RideTicket::PickupLocationId)
                            .to(Location::Table, Location::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_ticket_drop")
                            .from(RideTicket::Table, RideTicket::DropLocationId)
                            .to(Location::Table, Location::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_ticket_transport")
                            .from(RideTicket::Table, RideTicket::TransportId)
                            .to(Transport::Table, Transport::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_ticket_user")
                    .table(RideTicket::Table)
                    .col(RideTicket::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RideTicket::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TicketStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RideTicket {
    Table,
    Id,
    UserId,
    CityId,
    PickupLocationId,
    DropLocationId,
    TransportId,
    PickupDate,
    Status,
    Otp,
    OtpExpiresAt,
    Cost,
    Remarks,
    CreatedRole,
    RideStartTime,
    RideEndTime,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TicketStatus {
    #[sea_orm(iden = "ticket_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "ride_started")]
    RideStarted,
    #[sea_orm(iden = "completed")]
    Completed,
}

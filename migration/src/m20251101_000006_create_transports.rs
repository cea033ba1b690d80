use sea_orm_migration::{prelude::*, schema::*};

use super::m20251101_000001_create_cities::City;
use super::m20251101_000005_create_vendors::Vendor;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transport::Table)
                    .if_not_exists()
                    .col(pk_auto(Transport::Id))
                    .col(string_len(Transport::TransportCode, 50).not_null().unique_key())
                    .col(string_len(Transport::VehicleNo, 30).not_null())
                    .col(string_len(Transport::OwnerDetails, 255).not_null())
                    .col(string_len(Transport::Contact, 30).not_null())
                    .col(string_len(Transport::Email, 255).not_null())
                    .col(string_len(Transport::TransportType, 50).not_null())
                    .col(integer(Transport::Seater).not_null())
                    .col(integer(Transport::VendorId).not_null())
                    .col(integer(Transport::CityId).not_null())
                    .col(
                        timestamp_with_time_zone(Transport::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transport_vendor")
                            .from(Transport::Table, Transport::VendorId)
                            .to(Vendor::Table, Vendor::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transport_city")
                            .from(Transport::Table, Transport::CityId)
                            .to(City::Table, City::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transport::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Transport {
    Table,
    Id,
    TransportCode,
    VehicleNo,
    OwnerDetails,
    Contact,
    Email,
    TransportType,
    Seater,
    VendorId,
    CityId,
    CreatedAt,
}

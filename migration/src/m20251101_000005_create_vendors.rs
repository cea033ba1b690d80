use sea_orm_migration::{prelude::*, schema::*};

use super::m20251101_000001_create_cities::City;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vendor::Table)
                    .if_not_exists()
                    .col(pk_auto(Vendor::Id))
                    .col(string_len(Vendor::VendorCode, 50).not_null().unique_key())
                    .col(string_len(Vendor::Name, 100).not_null())
                    .col(integer(Vendor::CityId).not_null())
                    .col(string_len(Vendor::Address, 255).not_null())
                    .col(string_len(Vendor::Email, 255).not_null())
                    .col(string_len(Vendor::Mobile, 15).not_null())
                    .col(
                        timestamp_with_time_zone(Vendor::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendor_city")
                            .from(Vendor::Table, Vendor::CityId)
                            .to(City::Table, City::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vendor::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Vendor {
    Table,
    Id,
    VendorCode,
    Name,
    CityId,
    Address,
    Email,
    Mobile,
    CreatedAt,
}

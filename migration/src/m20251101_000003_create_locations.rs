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
                    .table(Location::Table)
                    .if_not_exists()
                    .col(pk_auto(Location::Id))
                    .col(string_len(Location::LocationCode, 50).not_null().unique_key())
                    .col(string_len(Location::Name, 100).not_null())
                    .col(integer(Location::CityId).not_null())
                    .col(
                        timestamp_with_time_zone(Location::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_city")
                            .from(Location::Table, Location::CityId)
                            .to(City::Table, City::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Location::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Location {
    Table,
    Id,
    LocationCode,
    Name,
    CityId,
    CreatedAt,
}

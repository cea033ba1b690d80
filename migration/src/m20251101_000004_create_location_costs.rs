use sea_orm_migration::{prelude::*, schema::*};

use super::m20251101_000001_create_cities::City;
use super::m20251101_000003_create_locations::Location;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LocationCost::Table)
                    .if_not_exists()
                    .col(pk_auto(LocationCost::Id))
                    .col(integer(LocationCost::CityId).not_null().unique_key())
                    .col(
                        timestamp_with_time_zone(LocationCost::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(LocationCost::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_cost_city")
                            .from(LocationCost::Table, LocationCost::CityId)
                            .to(City::Table, City::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LocationCostDetail::Table)
                    .if_not_exists()
                    .col(pk_auto(LocationCostDetail::Id))
                    .col(integer(LocationCostDetail::LocationCostId).not_null())
                    .col(integer(LocationCostDetail::PickupLocationId).not_null())
                    .col(integer(LocationCostDetail::DropLocationId).not_null())
                    .col(double(LocationCostDetail::Cost).not_null())
                    .check(
                        Expr::col(LocationCostDetail::PickupLocationId)
                            .ne(Expr::col(LocationCostDetail::DropLocationId)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_cost_detail_record")
                            .from(LocationCostDetail::Table, LocationCostDetail::LocationCostId)
                            .to(LocationCost::Table, LocationCost::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_cost_detail_pickup")
                            .from(LocationCostDetail::Table, LocationCostDetail::PickupLocationId)
                            .to(Location::Table, Location::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_cost_detail_drop")
                            .from(LocationCostDetail::Table, LocationCostDetail::DropLocationId)
                            .to(Location::Table, Location::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A pair is priced at most once per city
        manager
            .create_index(
                Index::create()
                    .name("idx_location_cost_detail_pair")
                    .table(LocationCostDetail::Table)
                    .col(LocationCostDetail::LocationCostId)
                    .col(LocationCostDetail::PickupLocationId)
                    .col(LocationCostDetail::DropLocationId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LocationCostDetail::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(LocationCost::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum LocationCost {
    Table,
    Id,
    CityId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum LocationCostDetail {
    Table,
    Id,
    LocationCostId,
    PickupLocationId,
    DropLocationId,
    Cost,
}

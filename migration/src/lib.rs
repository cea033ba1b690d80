pub use sea_orm_migration::prelude::*;

mod m20251101_000001_create_cities;
mod m20251101_000002_create_users;
mod m20251101_000003_create_locations;
mod m20251101_000004_create_location_costs;
mod m20251101_000005_create_vendors;
mod m20251101_000006_create_transports;
mod m20251101_000007_create_ride_tickets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251101_000001_create_cities::Migration),
            Box::new(m20251101_000002_create_users::Migration),
            Box::new(m20251101_000003_create_locations::Migration),
            Box::new(m20251101_000004_create_location_costs::Migration),
            Box::new(m20251101_000005_create_vendors::Migration),
            Box::new(m20251101_000006_create_transports::Migration),
            Box::new(m20251101_000007_create_ride_tickets::Migration),
        ]
    }
}

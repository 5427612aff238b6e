pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_brands_table;
mod m20240601_000002_create_catalogue_table;
mod m20240601_000003_create_locations_table;
mod m20240601_000004_create_stock_tables;
mod m20240601_000005_create_bom_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_brands_table::Migration),
            Box::new(m20240601_000002_create_catalogue_table::Migration),
            Box::new(m20240601_000003_create_locations_table::Migration),
            Box::new(m20240601_000004_create_stock_tables::Migration),
            Box::new(m20240601_000005_create_bom_tables::Migration),
        ]
    }
}

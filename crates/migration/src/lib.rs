pub use sea_orm_migration::prelude::*;

mod m20250601_000001_auth_init;
mod m20250601_000002_hr_core;
mod m20250601_000003_recruitment;

pub struct Migrator;
#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_auth_init::Migration),
            Box::new(m20250601_000002_hr_core::Migration),
            Box::new(m20250601_000003_recruitment::Migration),
        ]
    }
}

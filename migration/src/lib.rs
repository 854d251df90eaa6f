pub use sea_orm_migration::prelude::*;

mod m20250310_000001_create_entitlement_tables;
mod m20250427_000001_create_usage_alert_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250310_000001_create_entitlement_tables::Migration),
            Box::new(m20250427_000001_create_usage_alert_history::Migration),
        ]
    }
}

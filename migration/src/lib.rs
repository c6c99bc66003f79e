pub use sea_orm_migration::prelude::*;

mod m20261016_000001_create_users;
mod m20261016_000002_create_scan_history;
mod m20261016_000003_create_refresh_tokens;
mod m20261018_000004_add_refresh_token_lookup_indexes;
mod m20261016_000101_create_automation_runs;
mod m20261016_000102_create_automation_errors;

/// Primary relational schema: users, scan history, refresh tokens.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261016_000001_create_users::Migration),
            Box::new(m20261016_000002_create_scan_history::Migration),
            Box::new(m20261016_000003_create_refresh_tokens::Migration),
            Box::new(m20261018_000004_add_refresh_token_lookup_indexes::Migration),
        ]
    }
}

/// Embedded store for batch ingestion runs. Lives in its own database and
/// keeps its own version table so it never collides with [`Migrator`].
pub struct AutomationMigrator;

#[async_trait::async_trait]
impl MigratorTrait for AutomationMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261016_000101_create_automation_runs::Migration),
            Box::new(m20261016_000102_create_automation_errors::Migration),
        ]
    }

    fn migration_table_name() -> DynIden {
        Alias::new("seaql_automation_migrations").into_iden()
    }
}

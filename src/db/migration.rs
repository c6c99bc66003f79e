use migration::{AutomationMigrator, Migrator, MigratorTrait};
use sea_orm::{DatabaseConnection, DbErr};

pub async fn run(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await
}

pub async fn run_automation(db: &DatabaseConnection) -> Result<(), DbErr> {
    AutomationMigrator::up(db, None).await
}

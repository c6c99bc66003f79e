use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AutomationRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AutomationRuns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::StartedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::FinishedAt)
                            .date_time()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::DurationSeconds)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::PostsProcessed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::PostsSkipped)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::ErrorsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AutomationRuns::Stats).json().null())
                    .col(
                        ColumnDef::new(AutomationRuns::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-automation_runs-created_at")
                    .table(AutomationRuns::Table)
                    .col(AutomationRuns::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AutomationRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AutomationRuns {
    Table,
    Id,
    StartedAt,
    FinishedAt,
    DurationSeconds,
    PostsProcessed,
    PostsSkipped,
    ErrorsCount,
    Stats,
    CreatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AutomationErrors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AutomationErrors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AutomationErrors::Subreddit)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AutomationErrors::PostId)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AutomationErrors::PostTitle).text().null())
                    .col(
                        ColumnDef::new(AutomationErrors::ErrorMessage)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AutomationErrors::Resolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AutomationErrors::ResolvedAt)
                            .date_time()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AutomationErrors::CreatedAt)
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
                    .name("idx-automation_errors-created_at")
                    .table(AutomationErrors::Table)
                    .col(AutomationErrors::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-automation_errors-resolved-created_at")
                    .table(AutomationErrors::Table)
                    .col(AutomationErrors::Resolved)
                    .col(AutomationErrors::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AutomationErrors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AutomationErrors {
    Table,
    Id,
    Subreddit,
    PostId,
    PostTitle,
    ErrorMessage,
    Resolved,
    ResolvedAt,
    CreatedAt,
}

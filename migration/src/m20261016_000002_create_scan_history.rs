use sea_orm_migration::prelude::*;

use crate::m20261016_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScanHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScanHistory::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScanHistory::UserId).string_len(36).not_null())
                    .col(ColumnDef::new(ScanHistory::ImageUrl).text().null())
                    .col(ColumnDef::new(ScanHistory::ThumbnailUrl).text().null())
                    .col(ColumnDef::new(ScanHistory::ItemName).string_len(255).not_null())
                    .col(ColumnDef::new(ScanHistory::Category).string_len(100).null())
                    .col(ColumnDef::new(ScanHistory::Brand).string_len(100).null())
                    .col(ColumnDef::new(ScanHistory::Description).text().null())
                    .col(ColumnDef::new(ScanHistory::Condition).string_len(50).null())
                    .col(ColumnDef::new(ScanHistory::PriceRange).string_len(100).null())
                    .col(ColumnDef::new(ScanHistory::PlatformPrices).json_binary().null())
                    .col(
                        ColumnDef::new(ScanHistory::ConfidenceScore)
                            .integer()
                            .null()
                            .check(Expr::col(ScanHistory::ConfidenceScore).between(0, 100)),
                    )
                    .col(ColumnDef::new(ScanHistory::AiResponse).json_binary().null())
                    .col(
                        ColumnDef::new(ScanHistory::IsFavorite)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ScanHistory::Notes).text().null())
                    .col(
                        ColumnDef::new(ScanHistory::ScannedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScanHistory::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScanHistory::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-scan_history-user_id")
                            .from(ScanHistory::Table, ScanHistory::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One index per first-class query: timeline, favorites, category.
        for (name, second) in [
            ("idx-scan_history-user_id-scanned_at", ScanHistory::ScannedAt),
            ("idx-scan_history-user_id-is_favorite", ScanHistory::IsFavorite),
            ("idx-scan_history-user_id-category", ScanHistory::Category),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(ScanHistory::Table)
                        .col(ScanHistory::UserId)
                        .col(second)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScanHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScanHistory {
    Table,
    Id,
    UserId,
    ImageUrl,
    ThumbnailUrl,
    ItemName,
    Category,
    Brand,
    Description,
    Condition,
    PriceRange,
    PlatformPrices,
    ConfidenceScore,
    AiResponse,
    IsFavorite,
    Notes,
    ScannedAt,
    CreatedAt,
    UpdatedAt,
}

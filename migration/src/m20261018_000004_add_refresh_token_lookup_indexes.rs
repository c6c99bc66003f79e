use sea_orm_migration::prelude::*;

use crate::m20261016_000003_create_refresh_tokens::RefreshTokens;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEXES: [(&str, RefreshTokens); 3] = [
    ("idx-refresh_tokens-family", RefreshTokens::Family),
    ("idx-refresh_tokens-user_id", RefreshTokens::UserId),
    ("idx-refresh_tokens-expires_at", RefreshTokens::ExpiresAt),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, column) in INDEXES {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(RefreshTokens::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, _) in INDEXES {
            manager
                .drop_index(
                    Index::drop()
                        .name(name)
                        .table(RefreshTokens::Table)
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scan_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub item_name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub price_range: Option<String>,
    /// Platform name to estimated price, e.g. `{"ebay": "$25"}`.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub platform_prices: Option<Json>,
    /// 0..=100, enforced by a CHECK constraint.
    pub confidence_score: Option<i32>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub ai_response: Option<Json>,
    pub is_favorite: bool,
    pub notes: Option<String>,
    pub scanned_at: chrono::NaiveDateTime,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

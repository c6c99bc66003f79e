use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "automation_errors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub subreddit: String,
    pub post_id: String,
    pub post_title: Option<String>,
    pub error_message: String,
    pub resolved: bool,
    pub resolved_at: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

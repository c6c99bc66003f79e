use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use entity::user;

use crate::error::AppError;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: String,
    pub display_name: Option<String>,
}

pub async fn find_by_id(db: &DatabaseConnection, id: &str) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find_by_id(id).one(db).await?)
}

pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

pub async fn find_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?)
}

/// Insert a user. A lost race on email or username surfaces as
/// `AppError::Conflict` through the unique indexes.
pub async fn insert(db: &DatabaseConnection, new_user: NewUser<'_>) -> Result<user::Model, AppError> {
    let now = Utc::now().naive_utc();
    let model = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        email: Set(new_user.email.to_string()),
        username: Set(new_user.username.to_string()),
        password_hash: Set(new_user.password_hash),
        display_name: Set(new_user.display_name),
        avatar_url: Set(None),
        is_active: Set(true),
        email_verified: Set(false),
        role: Set("user".to_string()),
        preferences: Set(serde_json::json!({})),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

pub async fn record_login(db: &DatabaseConnection, id: &str) -> Result<(), AppError> {
    user::Entity::update_many()
        .col_expr(user::Column::LastLoginAt, Expr::value(Utc::now().naive_utc()))
        .filter(user::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn update(db: &DatabaseConnection, model: user::ActiveModel) -> Result<user::Model, AppError> {
    Ok(model.update(db).await?)
}

/// Delete a user. Scans and refresh tokens go with it via `ON DELETE CASCADE`.
pub async fn delete(db: &DatabaseConnection, id: &str) -> Result<bool, AppError> {
    let result = user::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

use axum::{extract::State, Json};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthenticatedUser;
use crate::db::queries;
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub role: String,
    pub preferences: serde_json::Value,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<entity::user::Model> for UserProfileResponse {
    fn from(user: entity::user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            email_verified: user.email_verified,
            role: user.role,
            preferences: user.preferences,
            last_login_at: user.last_login_at.map(|t| t.and_utc().to_rfc3339()),
            created_at: user.created_at.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub preferences: Option<serde_json::Value>,
}

// --- Handlers ---

pub async fn get_profile(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let db_user = queries::users::find_by_id(&state.db, &user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(db_user.into()))
}

pub async fn update_profile(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfileResponse>, AppError> {
    if let Some(preferences) = &req.preferences {
        if !preferences.is_object() {
            return Err(AppError::validation(
                "preferences",
                "Preferences must be a JSON object",
            ));
        }
    }

    let db_user = queries::users::find_by_id(&state.db, &user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: entity::user::ActiveModel = db_user.into();
    if let Some(display_name) = req.display_name {
        active.display_name = Set(Some(display_name));
    }
    if let Some(avatar_url) = req.avatar_url {
        active.avatar_url = Set(Some(avatar_url));
    }
    if let Some(preferences) = req.preferences {
        active.preferences = Set(preferences);
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = queries::users::update(&state.db, active).await?;
    Ok(Json(updated.into()))
}

/// Delete the caller's account along with all scans and sessions.
pub async fn delete_account(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !queries::users::delete(&state.db, &user.user_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(user_id = %user.user_id, "Account deleted");
    Ok(Json(serde_json::json!({"status": "ok"})))
}

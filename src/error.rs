use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;

use crate::auth::tokens::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Every refresh failure looks the same to the caller, reuse included.
    #[error("Invalid session, please log in again")]
    Auth(#[from] AuthError),

    #[error("Resource not found")]
    NotFound,

    #[error("The {0} is already in use")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("User account is disabled")]
    UserDisabled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                AppError::Conflict(conflicting_field(&detail).to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

/// Maps a driver's unique-violation text (`users.email`, `idx-users-username`)
/// to the field that collided.
fn conflicting_field(detail: &str) -> &'static str {
    ["username", "email", "token"]
        .into_iter()
        .find(|field| detail.contains(field))
        .unwrap_or("resource")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", self.to_string())
            }
            AppError::Validation { message, .. } => {
                (StatusCode::BAD_REQUEST, "validation_error", message.clone())
            }
            AppError::Auth(reason) => {
                tracing::debug!("refresh rejected: {reason}");
                (StatusCode::UNAUTHORIZED, "invalid_session", self.to_string())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict", self.to_string()),
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            AppError::UserDisabled => {
                (StatusCode::FORBIDDEN, "user_disabled", self.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error".to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error".to_string())
            }
            AppError::Jwt(_) => {
                (StatusCode::UNAUTHORIZED, "invalid_token", "Invalid token".to_string())
            }
        };

        let mut body = json!({
            "error": error_type,
            "message": message,
        });
        if let AppError::Validation { field, .. } = &self {
            body["field"] = json!(field);
        }

        (status, axum::Json(body)).into_response()
    }
}

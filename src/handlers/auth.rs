use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::{AuthenticatedUser, RequestDevice};
use crate::auth::password::{
    hash_password, validate_email, validate_password, validate_username, verify_password,
};
use crate::auth::tokens::{self, AuthError, DeviceContext, IssuedToken};
use crate::db::queries;
use crate::db::queries::users::NewUser;
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub device_info: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_info: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub device_info: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

fn device_context(device: RequestDevice, device_info: Option<serde_json::Value>) -> DeviceContext {
    DeviceContext {
        device_info: device_info.filter(|info| info.is_object()),
        fingerprint: device.fingerprint,
        ip_address: device.ip_address,
    }
}

fn token_response(state: &AppState, access_token: String, refresh: IssuedToken) -> TokenResponse {
    TokenResponse {
        access_token,
        refresh_token: refresh.token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_secs(),
        refresh_expires_at: refresh.expires_at.and_utc().to_rfc3339(),
    }
}

// --- Handlers ---

pub async fn register(
    device: RequestDevice,
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();

    validate_email(&email)?;
    validate_username(&username)?;
    validate_password(&req.password)?;

    if queries::users::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("email".to_string()));
    }
    if queries::users::find_by_username(&state.db, &username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("username".to_string()));
    }

    let user = queries::users::insert(
        &state.db,
        NewUser {
            email: &email,
            username: &username,
            password_hash: hash_password(&req.password)?,
            display_name: req.display_name,
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, "User registered");

    let access_token = state.jwt.issue_access_token(&user.id, &user.role)?;
    let refresh = tokens::issue(
        &state.db,
        &user.id,
        &device_context(device, req.device_info),
        None,
        state.config.refresh_token_expiry_days,
    )
    .await?;

    let tokens = token_response(&state, access_token, refresh);
    Ok(Json(RegisterResponse {
        user_id: user.id,
        tokens,
    }))
}

pub async fn login(
    device: RequestDevice,
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let email = req.email.trim().to_lowercase();

    let user = queries::users::find_by_email(&state.db, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::UserDisabled);
    }

    queries::users::record_login(&state.db, &user.id).await?;

    // Every login starts a new token family.
    let access_token = state.jwt.issue_access_token(&user.id, &user.role)?;
    let refresh = tokens::issue(
        &state.db,
        &user.id,
        &device_context(device, req.device_info),
        None,
        state.config.refresh_token_expiry_days,
    )
    .await?;

    Ok(Json(token_response(&state, access_token, refresh)))
}

pub async fn refresh(
    device: RequestDevice,
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let rotated = tokens::rotate(
        &state.db,
        &req.refresh_token,
        &device_context(device, req.device_info),
        state.config.refresh_token_expiry_days,
    )
    .await?;

    // Look up user for current role and status
    let Some(user) = queries::users::find_by_id(&state.db, &rotated.user_id).await? else {
        return Err(AuthError::NotFound.into());
    };

    if !user.is_active {
        tokens::revoke_family(&state.db, &rotated.issued.family).await?;
        return Err(AppError::UserDisabled);
    }

    let access_token = state.jwt.issue_access_token(&user.id, &user.role)?;
    Ok(Json(token_response(&state, access_token, rotated.issued)))
}

pub async fn logout(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tokens::revoke_presented(&state.db, &req.refresh_token, &user.user_id).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

pub async fn logout_all(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let revoked = tokens::revoke_all_for_user(&state.db, &user.user_id).await?;
    tracing::info!(user_id = %user.user_id, revoked, "Logged out from all devices");
    Ok(Json(serde_json::json!({"status": "ok", "revoked": revoked})))
}

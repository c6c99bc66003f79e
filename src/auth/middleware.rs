use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::auth::jwt::Claims;
use crate::db::queries;
use crate::error::AppError;
use crate::rate_limit::client_ip;

pub const FINGERPRINT_HEADER: &str = "X-Device-Fingerprint";

/// Extracts the authenticated user from a Bearer token. The user row is
/// re-read on every request so deactivation takes effect immediately.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync + AsRef<crate::AppState>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state: &crate::AppState = state.as_ref();

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let claims: Claims = app_state.jwt.verify_access_token(token)?;

        let user = queries::users::find_by_id(&app_state.db, &claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::UserDisabled);
        }

        Ok(AuthenticatedUser { user_id: user.id })
    }
}

/// Device fingerprint header and client IP of the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestDevice {
    pub fingerprint: Option<String>,
    pub ip_address: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestDevice
where
    S: Send + Sync + AsRef<crate::AppState>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let trust_proxy_headers = state.as_ref().config.trust_proxy_headers;

        let fingerprint = parts
            .headers
            .get(FINGERPRINT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.chars().take(255).collect());

        Ok(RequestDevice {
            fingerprint,
            ip_address: client_ip(&parts.headers, &parts.extensions, trust_proxy_headers),
        })
    }
}

use chrono::{Duration, NaiveDateTime, Utc};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use sha2::{Digest, Sha256};

use entity::refresh_token;

use crate::error::AppError;

/// Why a presented refresh token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("refresh token not found")]
    NotFound,
    #[error("refresh token expired")]
    Expired,
    #[error("refresh token already used")]
    Reused,
}

/// Where a token is being issued to. Stored alongside the token for audit.
#[derive(Debug, Clone, Default)]
pub struct DeviceContext {
    pub device_info: Option<serde_json::Value>,
    pub fingerprint: Option<String>,
    pub ip_address: Option<String>,
}

impl DeviceContext {
    /// Fill gaps from the token being rotated so a refresh without device
    /// headers keeps the original device attached to the family.
    fn or_inherit(&self, stored: &refresh_token::Model) -> DeviceContext {
        DeviceContext {
            device_info: self
                .device_info
                .clone()
                .or_else(|| stored.device_info.clone()),
            fingerprint: self
                .fingerprint
                .clone()
                .or_else(|| stored.fingerprint.clone()),
            ip_address: self
                .ip_address
                .clone()
                .or_else(|| stored.ip_address.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Raw token; only its digest is persisted.
    pub token: String,
    pub family: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct Rotated {
    pub user_id: String,
    pub issued: IssuedToken,
}

/// Generate a cryptographically random refresh token.
pub fn generate_refresh_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}

/// Hash a token with SHA-256 for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Insert a fresh, unused token. `family` is `None` on first login, which
/// starts a new family; rotations pass the family of the token they replace.
pub async fn issue<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    device: &DeviceContext,
    family: Option<&str>,
    ttl_days: i64,
) -> Result<IssuedToken, AppError> {
    let now = Utc::now().naive_utc();
    let expires_at = now + Duration::days(ttl_days);
    let token = generate_refresh_token();
    let family = family
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let model = refresh_token::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        token: Set(hash_token(&token)),
        family: Set(family.clone()),
        fingerprint: Set(device.fingerprint.clone()),
        device_info: Set(device.device_info.clone()),
        ip_address: Set(device.ip_address.clone()),
        used: Set(false),
        last_used_at: Set(None),
        expires_at: Set(expires_at),
        created_at: Set(now),
    };
    model.insert(db).await?;

    Ok(IssuedToken {
        token,
        family,
        expires_at,
    })
}

/// Exchange a valid, unused token for a new one in the same family.
///
/// Lookup, claim and insert share one transaction. The claim is a
/// conditional update on `used = false`, so of two concurrent rotations of
/// the same token exactly one sees an affected row; the other is treated as
/// reuse. Reuse revokes the whole family before failing.
pub async fn rotate(
    db: &DatabaseConnection,
    presented: &str,
    device: &DeviceContext,
    ttl_days: i64,
) -> Result<Rotated, AppError> {
    let txn = db.begin().await?;

    let stored = refresh_token::Entity::find()
        .filter(refresh_token::Column::Token.eq(hash_token(presented)))
        .one(&txn)
        .await?
        .ok_or(AuthError::NotFound)?;

    let now = Utc::now().naive_utc();
    if stored.expires_at < now {
        return Err(AuthError::Expired.into());
    }

    if stored.used {
        revoke_family(&txn, &stored.family).await?;
        txn.commit().await?;
        tracing::warn!(
            user_id = %stored.user_id,
            family = %stored.family,
            "Refresh token reuse detected, family revoked"
        );
        return Err(AuthError::Reused.into());
    }

    let result = claim_and_reissue(&txn, &stored, device, ttl_days).await;
    // A lost claim still has to persist the family revocation
    if matches!(result, Ok(_) | Err(AppError::Auth(AuthError::Reused))) {
        txn.commit().await?;
    }
    result
}

/// Claim `stored` with a conditional update on `used = false` and, if the
/// claim wins, issue its successor in the same family.
///
/// `stored` may be stale: when another rotation claimed the row after it was
/// read, zero rows are affected, the family is revoked and the result is
/// `Reused`.
pub async fn claim_and_reissue<C: ConnectionTrait>(
    db: &C,
    stored: &refresh_token::Model,
    device: &DeviceContext,
    ttl_days: i64,
) -> Result<Rotated, AppError> {
    let claimed = refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::Used, Expr::value(true))
        .col_expr(
            refresh_token::Column::LastUsedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(refresh_token::Column::Id.eq(stored.id.as_str()))
        .filter(refresh_token::Column::Used.eq(false))
        .exec(db)
        .await?;

    if claimed.rows_affected == 0 {
        revoke_family(db, &stored.family).await?;
        tracing::warn!(
            user_id = %stored.user_id,
            family = %stored.family,
            "Concurrent refresh token rotation lost the race, family revoked"
        );
        return Err(AuthError::Reused.into());
    }

    let issued = issue(
        db,
        &stored.user_id,
        &device.or_inherit(stored),
        Some(&stored.family),
        ttl_days,
    )
    .await?;

    Ok(Rotated {
        user_id: stored.user_id.clone(),
        issued,
    })
}

/// Mark every token of a family as used in a single statement.
pub async fn revoke_family<C: ConnectionTrait>(db: &C, family: &str) -> Result<u64, AppError> {
    let result = refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::Used, Expr::value(true))
        .filter(refresh_token::Column::Family.eq(family))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Logout: revoke the family of a token owned by `user_id`. A token that
/// belongs to someone else is reported as not found.
pub async fn revoke_presented(
    db: &DatabaseConnection,
    presented: &str,
    user_id: &str,
) -> Result<u64, AppError> {
    let stored = refresh_token::Entity::find()
        .filter(refresh_token::Column::Token.eq(hash_token(presented)))
        .filter(refresh_token::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(AuthError::NotFound)?;

    revoke_family(db, &stored.family).await
}

/// Logout from every device.
pub async fn revoke_all_for_user(db: &DatabaseConnection, user_id: &str) -> Result<u64, AppError> {
    let result = refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::Used, Expr::value(true))
        .filter(refresh_token::Column::UserId.eq(user_id))
        .filter(refresh_token::Column::Used.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Delete tokens that expired before `now`.
pub async fn purge_expired(db: &DatabaseConnection, now: NaiveDateTime) -> Result<u64, AppError> {
    let result = refresh_token::Entity::delete_many()
        .filter(refresh_token::Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use entity::scan_history;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::scans::{self, NewScan, Pagination, ScanFilter};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub id: String,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub item_name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub price_range: Option<String>,
    pub platform_prices: Option<serde_json::Value>,
    pub confidence_score: Option<i32>,
    pub ai_response: Option<serde_json::Value>,
    pub is_favorite: bool,
    pub notes: Option<String>,
    pub scanned_at: String,
    pub created_at: String,
}

impl From<scan_history::Model> for ScanResponse {
    fn from(scan: scan_history::Model) -> Self {
        Self {
            id: scan.id,
            image_url: scan.image_url,
            thumbnail_url: scan.thumbnail_url,
            item_name: scan.item_name,
            category: scan.category,
            brand: scan.brand,
            description: scan.description,
            condition: scan.condition,
            price_range: scan.price_range,
            platform_prices: scan.platform_prices,
            confidence_score: scan.confidence_score,
            ai_response: scan.ai_response,
            is_favorite: scan.is_favorite,
            notes: scan.notes,
            scanned_at: scan.scanned_at.and_utc().to_rfc3339(),
            created_at: scan.created_at.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListScansQuery {
    pub category: Option<String>,
    pub favorite_only: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ScanListResponse {
    pub scans: Vec<ScanResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
}

// --- Handlers ---

pub async fn create(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(req): Json<NewScan>,
) -> Result<Json<ScanResponse>, AppError> {
    let scan = scans::record_scan(&state.db, &user.user_id, req).await?;
    Ok(Json(scan.into()))
}

pub async fn list(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<ListScansQuery>,
) -> Result<Json<ScanListResponse>, AppError> {
    let filter = ScanFilter {
        category: query.category.filter(|c| !c.is_empty()),
        favorite_only: query.favorite_only.unwrap_or(false),
        since: query.since.map(|t| t.naive_utc()),
    };
    let page = scans::list_scans(
        &state.db,
        &user.user_id,
        &filter,
        Pagination::new(query.page, query.per_page)?,
    )
    .await?;

    Ok(Json(ScanListResponse {
        scans: page.items.into_iter().map(ScanResponse::from).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
    }))
}

pub async fn get(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScanResponse>, AppError> {
    let scan = scans::get_scan(&state.db, &id, &user.user_id).await?;
    Ok(Json(scan.into()))
}

pub async fn toggle_favorite(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScanResponse>, AppError> {
    let scan = scans::toggle_favorite(&state.db, &id, &user.user_id).await?;
    Ok(Json(scan.into()))
}

pub async fn update_notes(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNotesRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    let scan = scans::update_notes(&state.db, &id, &user.user_id, req.notes).await?;
    Ok(Json(scan.into()))
}

pub async fn delete(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    scans::delete_scan(&state.db, &id, &user.user_id).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

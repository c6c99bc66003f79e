//! Scan history: AI-derived item assessments, one row per scan, always
//! scoped to the owning user.

use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;

use entity::scan_history;

use crate::error::AppError;

pub const MAX_PER_PAGE: u64 = 100;
pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PAGE: u64 = 10_000;

/// Assessment as returned by the vision service, plus client metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewScan {
    pub item_name: String,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub price_range: Option<String>,
    pub platform_prices: Option<serde_json::Value>,
    pub confidence_score: Option<i64>,
    pub ai_response: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub scanned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub category: Option<String>,
    pub favorite_only: bool,
    pub since: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    page: u64,
    per_page: u64,
}

impl Pagination {
    /// 1-based page, `per_page` clamped to `1..=MAX_PER_PAGE`. Pages past
    /// `MAX_PAGE` are rejected.
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1).max(1);
        if page > MAX_PAGE {
            return Err(AppError::validation(
                "page",
                format!("Page must be at most {MAX_PAGE}"),
            ));
        }
        Ok(Self {
            page,
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanPage {
    pub items: Vec<scan_history::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

pub fn validate(scan: &NewScan) -> Result<(), AppError> {
    if scan.item_name.trim().is_empty() {
        return Err(AppError::validation("item_name", "Item name is required"));
    }
    if let Some(score) = scan.confidence_score {
        if !(0..=100).contains(&score) {
            return Err(AppError::validation(
                "confidence_score",
                "Confidence score must be between 0 and 100",
            ));
        }
    }
    if let Some(prices) = &scan.platform_prices {
        if !prices.is_object() {
            return Err(AppError::validation(
                "platform_prices",
                "Platform prices must be an object of platform to price",
            ));
        }
    }
    Ok(())
}

/// Validate and store a scan. Nothing is written if validation fails.
pub async fn record_scan(
    db: &DatabaseConnection,
    user_id: &str,
    scan: NewScan,
) -> Result<scan_history::Model, AppError> {
    validate(&scan)?;

    let now = Utc::now().naive_utc();
    let model = scan_history::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        image_url: Set(scan.image_url),
        thumbnail_url: Set(scan.thumbnail_url),
        item_name: Set(scan.item_name.trim().to_string()),
        category: Set(scan.category),
        brand: Set(scan.brand),
        description: Set(scan.description),
        condition: Set(scan.condition),
        price_range: Set(scan.price_range),
        platform_prices: Set(scan.platform_prices),
        confidence_score: Set(scan.confidence_score.and_then(|s| i32::try_from(s).ok())),
        ai_response: Set(scan.ai_response),
        is_favorite: Set(false),
        notes: Set(scan.notes),
        scanned_at: Set(scan.scanned_at.map(|t| t.naive_utc()).unwrap_or(now)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let saved = model.insert(db).await?;
    tracing::debug!(scan_id = %saved.id, user_id, "Recorded scan");
    Ok(saved)
}

/// A user's scans, newest `scanned_at` first.
pub async fn list_scans(
    db: &DatabaseConnection,
    user_id: &str,
    filter: &ScanFilter,
    pagination: Pagination,
) -> Result<ScanPage, AppError> {
    let mut query = scan_history::Entity::find()
        .filter(scan_history::Column::UserId.eq(user_id))
        .order_by_desc(scan_history::Column::ScannedAt)
        .order_by_desc(scan_history::Column::Id);

    if let Some(category) = &filter.category {
        query = query.filter(scan_history::Column::Category.eq(category.as_str()));
    }
    if filter.favorite_only {
        query = query.filter(scan_history::Column::IsFavorite.eq(true));
    }
    if let Some(since) = filter.since {
        query = query.filter(scan_history::Column::ScannedAt.gte(since));
    }

    let paginator = query.paginate(db, pagination.per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(pagination.page.saturating_sub(1)).await?;

    Ok(ScanPage {
        items,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
    })
}

/// Fetch a scan only if `user_id` owns it. Missing and foreign scans are
/// indistinguishable to the caller.
pub async fn get_scan(
    db: &DatabaseConnection,
    scan_id: &str,
    user_id: &str,
) -> Result<scan_history::Model, AppError> {
    scan_history::Entity::find_by_id(scan_id)
        .filter(scan_history::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn toggle_favorite(
    db: &DatabaseConnection,
    scan_id: &str,
    user_id: &str,
) -> Result<scan_history::Model, AppError> {
    let scan = get_scan(db, scan_id, user_id).await?;
    let is_favorite = !scan.is_favorite;

    let mut active: scan_history::ActiveModel = scan.into();
    active.is_favorite = Set(is_favorite);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

pub async fn update_notes(
    db: &DatabaseConnection,
    scan_id: &str,
    user_id: &str,
    notes: Option<String>,
) -> Result<scan_history::Model, AppError> {
    let scan = get_scan(db, scan_id, user_id).await?;

    let mut active: scan_history::ActiveModel = scan.into();
    active.notes = Set(notes.filter(|n| !n.trim().is_empty()));
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

pub async fn delete_scan(
    db: &DatabaseConnection,
    scan_id: &str,
    user_id: &str,
) -> Result<(), AppError> {
    let result = scan_history::Entity::delete_many()
        .filter(scan_history::Column::Id.eq(scan_id))
        .filter(scan_history::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

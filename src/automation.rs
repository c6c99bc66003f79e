//! Audit trail for the batch ingestion job, kept in its own SQLite store.
//!
//! Nothing here shares a transaction with the primary database. `finish_run`
//! and `log_error` swallow and log their failures so a broken audit store
//! never interrupts the job that is being audited.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use entity::{automation_error, automation_run};

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub processed: i32,
    pub skipped: i32,
    pub errors: i32,
    pub stats: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct AutomationTracker {
    db: DatabaseConnection,
}

impl AutomationTracker {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn start_run(&self) -> Result<i32, DbErr> {
        let now = Utc::now().naive_utc();
        let run = automation_run::ActiveModel {
            started_at: Set(now),
            posts_processed: Set(0),
            posts_skipped: Set(0),
            errors_count: Set(0),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::info!(run_id = run.id, "Automation run started");
        Ok(run.id)
    }

    /// Close a run and store `duration_seconds = finished_at - started_at`.
    pub async fn finish_run(&self, run_id: i32, outcome: RunOutcome) {
        if let Err(e) = self.try_finish_run(run_id, outcome).await {
            tracing::warn!(run_id, "Failed to record automation run outcome: {e}");
        }
    }

    async fn try_finish_run(&self, run_id: i32, outcome: RunOutcome) -> Result<(), DbErr> {
        let run = automation_run::Entity::find_by_id(run_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("automation run {run_id}")))?;

        let finished_at = Utc::now().naive_utc();
        let duration = (finished_at - run.started_at).num_milliseconds() as f64 / 1000.0;

        let mut active: automation_run::ActiveModel = run.into();
        active.finished_at = Set(Some(finished_at));
        active.duration_seconds = Set(Some(duration));
        active.posts_processed = Set(outcome.processed);
        active.posts_skipped = Set(outcome.skipped);
        active.errors_count = Set(outcome.errors);
        active.stats = Set(outcome.stats);
        active.update(&self.db).await?;

        tracing::info!(
            run_id,
            duration_seconds = duration,
            processed = outcome.processed,
            skipped = outcome.skipped,
            errors = outcome.errors,
            "Automation run finished"
        );
        Ok(())
    }

    /// Append an error record for one post.
    pub async fn log_error(&self, subreddit: &str, post_id: &str, title: Option<&str>, message: &str) {
        let record = automation_error::ActiveModel {
            subreddit: Set(subreddit.to_string()),
            post_id: Set(post_id.to_string()),
            post_title: Set(title.map(str::to_string)),
            error_message: Set(message.to_string()),
            resolved: Set(false),
            resolved_at: Set(None),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        if let Err(e) = record.insert(&self.db).await {
            tracing::warn!(subreddit, post_id, "Failed to log automation error: {e}");
        }
    }

    /// Returns `false` when no such error exists.
    pub async fn resolve(&self, error_id: i32) -> Result<bool, DbErr> {
        let Some(record) = automation_error::Entity::find_by_id(error_id)
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        let mut active: automation_error::ActiveModel = record.into();
        active.resolved = Set(true);
        active.resolved_at = Set(Some(Utc::now().naive_utc()));
        active.update(&self.db).await?;
        Ok(true)
    }

    pub async fn recent_runs(&self, limit: u64) -> Result<Vec<automation_run::Model>, DbErr> {
        automation_run::Entity::find()
            .order_by_desc(automation_run::Column::CreatedAt)
            .order_by_desc(automation_run::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
    }

    pub async fn unresolved_errors(
        &self,
        limit: u64,
    ) -> Result<Vec<automation_error::Model>, DbErr> {
        automation_error::Entity::find()
            .filter(automation_error::Column::Resolved.eq(false))
            .order_by_desc(automation_error::Column::CreatedAt)
            .order_by_desc(automation_error::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
    }
}

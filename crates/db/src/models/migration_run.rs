//! Migration run model.

use arkivo_core::migration::MigrationStatus;
use arkivo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `migrations_runs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MigrationRun {
    pub id: DbId,
    pub title: String,
    pub manifest_key: String,
    pub manifest_row_count: i32,
    pub status: String,
    pub analysis_summary: Option<serde_json::Value>,
    pub target_bucket: Option<String>,
    pub processed_events: i32,
    pub succeeded_events: i32,
    pub failed_events: i32,
    pub skipped_events: i32,
    pub progress_pct: f32,
    pub analyzed_at: Option<Timestamp>,
    pub execution_started_at: Option<Timestamp>,
    pub execution_completed_at: Option<Timestamp>,
    pub created_by: Option<String>,
    pub approved_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MigrationRun {
    /// Typed view of the status column. The column carries a CHECK
    /// constraint, so this only returns `None` for rows written by a
    /// newer schema.
    pub fn status(&self) -> Option<MigrationStatus> {
        MigrationStatus::from_str(&self.status)
    }
}

/// DTO for creating a new migration run.
#[derive(Debug, Deserialize)]
pub struct CreateMigrationRun {
    pub title: String,
    pub manifest_key: String,
    pub target_bucket: Option<String>,
    pub created_by: Option<String>,
    pub notes: Option<String>,
}

/// Per-run event counters persisted after each event group.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunProgress {
    pub processed_events: i32,
    pub succeeded_events: i32,
    pub failed_events: i32,
    pub skipped_events: i32,
    pub progress_pct: f32,
}

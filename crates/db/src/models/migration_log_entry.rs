//! Migration log entry model.

use arkivo_core::migration::LogSeverity;
use arkivo_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the append-only `migration_log_entries` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MigrationLogEntry {
    pub id: DbId,
    pub migration_id: DbId,
    pub severity: String,
    pub message: String,
    pub event_code: Option<String>,
    pub context: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

impl MigrationLogEntry {
    pub fn severity(&self) -> Option<LogSeverity> {
        LogSeverity::from_str(&self.severity)
    }
}

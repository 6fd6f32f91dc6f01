//! File decision model.

use arkivo_core::migration::DecisionAction;
use arkivo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `file_decisions` table. At most one decision per
/// catalog entry; re-submitting replaces the previous decision.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FileDecision {
    pub id: DbId,
    pub migration_id: DbId,
    pub catalog_entry_id: DbId,
    pub action: String,
    pub new_filename: Option<String>,
    pub target_category: Option<String>,
    pub target_key: Option<String>,
    pub notes: Option<String>,
    pub decided_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FileDecision {
    pub fn action(&self) -> Option<DecisionAction> {
        DecisionAction::from_str(&self.action)
    }
}

/// DTO for recording (or replacing) a decision.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertFileDecision {
    pub catalog_entry_id: DbId,
    pub action: DecisionAction,
    pub new_filename: Option<String>,
    pub target_category: Option<String>,
    pub target_key: Option<String>,
    pub notes: Option<String>,
    pub decided_by: Option<String>,
}

/// A decision joined with the catalog entry it covers, as the executor
/// consumes it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DecisionWithEntry {
    pub decision_id: DbId,
    pub catalog_entry_id: DbId,
    pub event_code: String,
    pub storage_key: String,
    pub filename: String,
    pub file_type: String,
    pub category: String,
    pub size_bytes: Option<i64>,
    pub media_type: Option<String>,
    pub needs_extraction: bool,
    pub action: String,
    pub new_filename: Option<String>,
    pub target_category: Option<String>,
    pub target_key: Option<String>,
}

impl DecisionWithEntry {
    pub fn action(&self) -> Option<DecisionAction> {
        DecisionAction::from_str(&self.action)
    }
}

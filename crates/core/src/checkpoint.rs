//! Resumable-run checkpoints.
//!
//! Long phases (analysis, execution) record progress in a small JSON
//! document so an interrupted run can resume without redoing work. The
//! document is rewritten in full every [`CHECKPOINT_WRITE_INTERVAL`]
//! processed items; I/O lives with the caller, this module only owns the
//! document shape and the resume arithmetic.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Processed-item count between full checkpoint rewrites.
pub const CHECKPOINT_WRITE_INTERVAL: usize = 10;

/// Progress document for one run phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub migration_run_id: DbId,
    /// Phase label, e.g. "analysis" or "execution".
    pub phase: String,
    /// Keys of items already processed, in completion order.
    pub processed: Vec<String>,
    /// Keys that failed; retried on resume.
    pub failed: Vec<String>,
    pub updated_at: crate::types::Timestamp,
}

impl RunCheckpoint {
    pub fn new(migration_run_id: DbId, phase: impl Into<String>) -> Self {
        Self {
            migration_run_id,
            phase: phase.into(),
            processed: Vec::new(),
            failed: Vec::new(),
            updated_at: chrono::Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize checkpoint: {e}")))
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text)
            .map_err(|e| CoreError::Validation(format!("Malformed checkpoint: {e}")))
    }

    /// Record a completed item. Returns true when the caller should
    /// persist the document.
    pub fn record_processed(&mut self, key: impl Into<String>) -> bool {
        self.processed.push(key.into());
        self.updated_at = chrono::Utc::now();
        self.processed.len() % CHECKPOINT_WRITE_INTERVAL == 0
    }

    /// Record a failed item. Failures always persist immediately.
    pub fn record_failed(&mut self, key: impl Into<String>) {
        self.failed.push(key.into());
        self.updated_at = chrono::Utc::now();
    }

    /// Filter a work list down to what still needs doing on resume.
    /// Processed items are never reprocessed; failed items are retried.
    pub fn remaining<'a>(&self, items: &'a [String]) -> Vec<&'a String> {
        let done: BTreeSet<&str> = self.processed.iter().map(|s| s.as_str()).collect();
        items.iter().filter(|k| !done.contains(k.as_str())).collect()
    }

    /// Guard against resuming with the wrong document.
    pub fn matches(&self, migration_run_id: DbId, phase: &str) -> bool {
        self.migration_run_id == migration_run_id && self.phase == phase
    }
}

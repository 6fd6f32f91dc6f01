//! File catalog entry model.

use arkivo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `file_catalog_entries` table. One row per scanned
/// source object, written during analysis.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FileCatalogEntry {
    pub id: DbId,
    pub migration_id: DbId,
    pub event_code: String,
    pub storage_key: String,
    pub filename: String,
    pub directory: String,
    pub file_type: String,
    pub category: String,
    pub extension: Option<String>,
    pub size_bytes: Option<i64>,
    pub media_type: Option<String>,
    pub suggested_action: String,
    pub suggested_category: Option<String>,
    pub conflicts: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub matched_manifest: bool,
    pub needs_extraction: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFileCatalogEntry {
    pub event_code: String,
    pub storage_key: String,
    pub filename: String,
    pub directory: String,
    pub file_type: String,
    pub category: String,
    pub extension: Option<String>,
    pub size_bytes: Option<i64>,
    pub media_type: Option<String>,
    pub suggested_action: String,
    pub suggested_category: Option<String>,
    pub conflicts: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub matched_manifest: bool,
    pub needs_extraction: bool,
}

//! Media file model.
//!
//! The durable output of a completed migration. Rows reference their
//! source run and catalog entry as plain nullable columns, so deleting a
//! run never deletes migrated media.

use arkivo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `media_files` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MediaFile {
    pub id: DbId,
    pub event_code: String,
    pub file_type: String,
    pub category: String,
    pub filename: String,
    pub storage_key: String,
    pub storage_bucket: String,
    pub size_bytes: Option<i64>,
    pub media_type: Option<String>,
    pub duration_secs: Option<f32>,
    pub bitrate_kbps: Option<i32>,
    pub codec: Option<String>,
    pub resolution: Option<String>,
    pub language: Option<String>,
    pub page_count: Option<i32>,
    pub session_number: Option<i32>,
    pub track_number: Option<i32>,
    pub is_translation: bool,
    pub is_legacy: bool,
    pub migration_id: Option<DbId>,
    pub catalog_entry_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a migrated media file.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaFile {
    pub event_code: String,
    pub file_type: String,
    pub category: String,
    pub filename: String,
    pub storage_key: String,
    pub storage_bucket: String,
    pub size_bytes: Option<i64>,
    pub media_type: Option<String>,
    pub duration_secs: Option<f32>,
    pub bitrate_kbps: Option<i32>,
    pub codec: Option<String>,
    pub resolution: Option<String>,
    pub language: Option<String>,
    pub page_count: Option<i32>,
    pub session_number: Option<i32>,
    pub track_number: Option<i32>,
    pub is_translation: bool,
    pub is_legacy: bool,
    pub migration_id: Option<DbId>,
    pub catalog_entry_id: Option<DbId>,
}

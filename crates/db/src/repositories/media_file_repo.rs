//! Repository for the `media_files` table.

use arkivo_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::media_file::{CreateMediaFile, MediaFile};

/// Column list for media_files queries.
const COLUMNS: &str = "id, event_code, file_type, category, filename, storage_key, \
    storage_bucket, size_bytes, media_type, duration_secs, bitrate_kbps, codec, \
    resolution, language, page_count, session_number, track_number, is_translation, \
    is_legacy, migration_id, catalog_entry_id, created_at, updated_at";

const INSERT_COLUMNS: &str = "event_code, file_type, category, filename, storage_key, \
    storage_bucket, size_bytes, media_type, duration_secs, bitrate_kbps, codec, \
    resolution, language, page_count, session_number, track_number, is_translation, \
    is_legacy, migration_id, catalog_entry_id";

/// Provides registration and lookup for migrated media files.
pub struct MediaFileRepo;

impl MediaFileRepo {
    /// Register one migrated file. Re-running an event updates the row
    /// in place keyed on the target location.
    pub async fn upsert(pool: &PgPool, input: &CreateMediaFile) -> Result<MediaFile, sqlx::Error> {
        let query = Self::upsert_sql();
        Self::bind_insert(sqlx::query_as::<_, MediaFile>(&query), input)
            .fetch_one(pool)
            .await
    }

    /// Register an event's files inside the caller's transaction.
    pub async fn upsert_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateMediaFile,
    ) -> Result<MediaFile, sqlx::Error> {
        let query = Self::upsert_sql();
        Self::bind_insert(sqlx::query_as::<_, MediaFile>(&query), input)
            .fetch_one(&mut **tx)
            .await
    }

    /// List all files for an event, ordered for display.
    pub async fn list_for_event(
        pool: &PgPool,
        event_code: &str,
    ) -> Result<Vec<MediaFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_files
             WHERE event_code = $1
             ORDER BY session_number NULLS LAST, track_number NULLS LAST, filename"
        );
        sqlx::query_as::<_, MediaFile>(&query)
            .bind(event_code)
            .fetch_all(pool)
            .await
    }

    /// Files produced by a given run.
    pub async fn list_for_migration(
        pool: &PgPool,
        migration_id: DbId,
    ) -> Result<Vec<MediaFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_files
             WHERE migration_id = $1
             ORDER BY event_code, storage_key"
        );
        sqlx::query_as::<_, MediaFile>(&query)
            .bind(migration_id)
            .fetch_all(pool)
            .await
    }

    /// Look up a file by its storage location.
    pub async fn find_by_location(
        pool: &PgPool,
        bucket: &str,
        key: &str,
    ) -> Result<Option<MediaFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_files
             WHERE storage_bucket = $1 AND storage_key = $2"
        );
        sqlx::query_as::<_, MediaFile>(&query)
            .bind(bucket)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    fn upsert_sql() -> String {
        format!(
            "INSERT INTO media_files ({INSERT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                     $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
             ON CONFLICT (storage_bucket, storage_key) DO UPDATE SET
                event_code = EXCLUDED.event_code,
                file_type = EXCLUDED.file_type,
                category = EXCLUDED.category,
                filename = EXCLUDED.filename,
                size_bytes = EXCLUDED.size_bytes,
                media_type = EXCLUDED.media_type,
                session_number = EXCLUDED.session_number,
                track_number = EXCLUDED.track_number,
                is_translation = EXCLUDED.is_translation,
                is_legacy = EXCLUDED.is_legacy,
                migration_id = EXCLUDED.migration_id,
                catalog_entry_id = EXCLUDED.catalog_entry_id,
                updated_at = now()
             RETURNING {COLUMNS}"
        )
    }

    fn bind_insert<'q>(
        query: sqlx::query::QueryAs<'q, Postgres, MediaFile, sqlx::postgres::PgArguments>,
        input: &'q CreateMediaFile,
    ) -> sqlx::query::QueryAs<'q, Postgres, MediaFile, sqlx::postgres::PgArguments> {
        query
            .bind(&input.event_code)
            .bind(&input.file_type)
            .bind(&input.category)
            .bind(&input.filename)
            .bind(&input.storage_key)
            .bind(&input.storage_bucket)
            .bind(input.size_bytes)
            .bind(&input.media_type)
            .bind(input.duration_secs)
            .bind(input.bitrate_kbps)
            .bind(&input.codec)
            .bind(&input.resolution)
            .bind(&input.language)
            .bind(input.page_count)
            .bind(input.session_number)
            .bind(input.track_number)
            .bind(input.is_translation)
            .bind(input.is_legacy)
            .bind(input.migration_id)
            .bind(input.catalog_entry_id)
    }
}

//! Repository for the `file_catalog_entries` table.

use arkivo_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::file_catalog_entry::{CreateFileCatalogEntry, FileCatalogEntry};

/// Column list for file_catalog_entries queries.
const COLUMNS: &str = "id, migration_id, event_code, storage_key, filename, directory, \
    file_type, category, extension, size_bytes, media_type, suggested_action, \
    suggested_category, conflicts, metadata, matched_manifest, needs_extraction, \
    created_at, updated_at";

const INSERT_COLUMNS: &str = "migration_id, event_code, storage_key, filename, directory, \
    file_type, category, extension, size_bytes, media_type, suggested_action, \
    suggested_category, conflicts, metadata, matched_manifest, needs_extraction";

/// Provides catalog operations for scanned source objects.
pub struct FileCatalogRepo;

impl FileCatalogRepo {
    /// Insert one catalog entry. Catalog rows are immutable: re-inserting
    /// an already cataloged key keeps the existing row and returns it.
    pub async fn insert(
        pool: &PgPool,
        migration_id: DbId,
        input: &CreateFileCatalogEntry,
    ) -> Result<FileCatalogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO file_catalog_entries ({INSERT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (migration_id, event_code, storage_key) DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted =
            Self::bind_insert(sqlx::query_as::<_, FileCatalogEntry>(&query), migration_id, input)
                .fetch_optional(pool)
                .await?;
        match inserted {
            Some(row) => Ok(row),
            None => {
                Self::find_by_key(pool, migration_id, &input.event_code, &input.storage_key).await
            }
        }
    }

    /// Insert a whole event's entries in one transaction, so a failed
    /// event scan leaves no partial catalog behind. Existing rows are
    /// left untouched and returned as-is.
    pub async fn insert_event_batch(
        tx: &mut Transaction<'_, Postgres>,
        migration_id: DbId,
        inputs: &[CreateFileCatalogEntry],
    ) -> Result<Vec<FileCatalogEntry>, sqlx::Error> {
        let insert = format!(
            "INSERT INTO file_catalog_entries ({INSERT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (migration_id, event_code, storage_key) DO NOTHING
             RETURNING {COLUMNS}"
        );
        let select = format!(
            "SELECT {COLUMNS} FROM file_catalog_entries
             WHERE migration_id = $1 AND event_code = $2 AND storage_key = $3"
        );
        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            let inserted =
                Self::bind_insert(sqlx::query_as::<_, FileCatalogEntry>(&insert), migration_id, input)
                    .fetch_optional(&mut **tx)
                    .await?;
            let row = match inserted {
                Some(row) => row,
                None => sqlx::query_as::<_, FileCatalogEntry>(&select)
                    .bind(migration_id)
                    .bind(&input.event_code)
                    .bind(&input.storage_key)
                    .fetch_one(&mut **tx)
                    .await?,
            };
            rows.push(row);
        }
        Ok(rows)
    }

    /// Entry by its natural key.
    pub async fn find_by_key(
        pool: &PgPool,
        migration_id: DbId,
        event_code: &str,
        storage_key: &str,
    ) -> Result<FileCatalogEntry, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM file_catalog_entries
             WHERE migration_id = $1 AND event_code = $2 AND storage_key = $3"
        );
        sqlx::query_as::<_, FileCatalogEntry>(&query)
            .bind(migration_id)
            .bind(event_code)
            .bind(storage_key)
            .fetch_one(pool)
            .await
    }

    /// Find an entry by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<FileCatalogEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM file_catalog_entries WHERE id = $1");
        sqlx::query_as::<_, FileCatalogEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all entries for a run, in event/key order.
    pub async fn list_for_run(
        pool: &PgPool,
        migration_id: DbId,
    ) -> Result<Vec<FileCatalogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM file_catalog_entries
             WHERE migration_id = $1
             ORDER BY event_code, storage_key"
        );
        sqlx::query_as::<_, FileCatalogEntry>(&query)
            .bind(migration_id)
            .fetch_all(pool)
            .await
    }

    /// List entries for one event within a run.
    pub async fn list_for_event(
        pool: &PgPool,
        migration_id: DbId,
        event_code: &str,
    ) -> Result<Vec<FileCatalogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM file_catalog_entries
             WHERE migration_id = $1 AND event_code = $2
             ORDER BY storage_key"
        );
        sqlx::query_as::<_, FileCatalogEntry>(&query)
            .bind(migration_id)
            .bind(event_code)
            .fetch_all(pool)
            .await
    }

    /// Distinct event codes present in a run's catalog, ordered.
    pub async fn event_codes(
        pool: &PgPool,
        migration_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT event_code FROM file_catalog_entries
             WHERE migration_id = $1 ORDER BY event_code",
        )
        .bind(migration_id)
        .fetch_all(pool)
        .await
    }

    /// Count entries with no settled decision. Review decisions count as
    /// undecided; the run cannot be approved until this reaches zero.
    pub async fn count_undecided(pool: &PgPool, migration_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM file_catalog_entries c
             LEFT JOIN file_decisions d ON d.catalog_entry_id = c.id
             WHERE c.migration_id = $1
               AND (d.id IS NULL OR d.action = 'review')",
        )
        .bind(migration_id)
        .fetch_one(pool)
        .await
    }

    fn bind_insert<'q>(
        query: sqlx::query::QueryAs<'q, Postgres, FileCatalogEntry, sqlx::postgres::PgArguments>,
        migration_id: DbId,
        input: &'q CreateFileCatalogEntry,
    ) -> sqlx::query::QueryAs<'q, Postgres, FileCatalogEntry, sqlx::postgres::PgArguments> {
        query
            .bind(migration_id)
            .bind(&input.event_code)
            .bind(&input.storage_key)
            .bind(&input.filename)
            .bind(&input.directory)
            .bind(&input.file_type)
            .bind(&input.category)
            .bind(&input.extension)
            .bind(input.size_bytes)
            .bind(&input.media_type)
            .bind(&input.suggested_action)
            .bind(&input.suggested_category)
            .bind(&input.conflicts)
            .bind(&input.metadata)
            .bind(input.matched_manifest)
            .bind(input.needs_extraction)
    }
}

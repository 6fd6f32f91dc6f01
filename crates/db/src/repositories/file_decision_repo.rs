//! Repository for the `file_decisions` table.

use arkivo_core::types::DbId;
use sqlx::PgPool;

use crate::models::file_decision::{DecisionWithEntry, FileDecision, UpsertFileDecision};

/// Column list for file_decisions queries.
const COLUMNS: &str = "id, migration_id, catalog_entry_id, action, new_filename, \
    target_category, target_key, notes, decided_by, created_at, updated_at";

const UPSERT_SQL_TAIL: &str = "ON CONFLICT (migration_id, catalog_entry_id) DO UPDATE SET
        action = EXCLUDED.action,
        new_filename = EXCLUDED.new_filename,
        target_category = EXCLUDED.target_category,
        target_key = EXCLUDED.target_key,
        notes = EXCLUDED.notes,
        decided_by = EXCLUDED.decided_by,
        updated_at = now()";

/// Provides ledger operations for per-file decisions.
pub struct FileDecisionRepo;

impl FileDecisionRepo {
    /// Record a decision, replacing any previous decision for the entry.
    pub async fn upsert(
        pool: &PgPool,
        migration_id: DbId,
        input: &UpsertFileDecision,
    ) -> Result<FileDecision, sqlx::Error> {
        let query = format!(
            "INSERT INTO file_decisions
                (migration_id, catalog_entry_id, action, new_filename,
                 target_category, target_key, notes, decided_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             {UPSERT_SQL_TAIL}
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FileDecision>(&query)
            .bind(migration_id)
            .bind(input.catalog_entry_id)
            .bind(input.action.as_str())
            .bind(&input.new_filename)
            .bind(&input.target_category)
            .bind(&input.target_key)
            .bind(&input.notes)
            .bind(&input.decided_by)
            .fetch_one(pool)
            .await
    }

    /// Record many decisions atomically. Used by the bulk-apply endpoint
    /// of the suggestion flow; all rows land or none do.
    pub async fn bulk_upsert(
        pool: &PgPool,
        migration_id: DbId,
        inputs: &[UpsertFileDecision],
    ) -> Result<Vec<FileDecision>, sqlx::Error> {
        let query = format!(
            "INSERT INTO file_decisions
                (migration_id, catalog_entry_id, action, new_filename,
                 target_category, target_key, notes, decided_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             {UPSERT_SQL_TAIL}
             RETURNING {COLUMNS}"
        );
        let mut tx = pool.begin().await?;
        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            let row = sqlx::query_as::<_, FileDecision>(&query)
                .bind(migration_id)
                .bind(input.catalog_entry_id)
                .bind(input.action.as_str())
                .bind(&input.new_filename)
                .bind(&input.target_category)
                .bind(&input.target_key)
                .bind(&input.notes)
                .bind(&input.decided_by)
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }
        tx.commit().await?;
        Ok(rows)
    }

    /// Find the decision covering one catalog entry.
    pub async fn find_for_entry(
        pool: &PgPool,
        migration_id: DbId,
        catalog_entry_id: DbId,
    ) -> Result<Option<FileDecision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM file_decisions
             WHERE migration_id = $1 AND catalog_entry_id = $2"
        );
        sqlx::query_as::<_, FileDecision>(&query)
            .bind(migration_id)
            .bind(catalog_entry_id)
            .fetch_optional(pool)
            .await
    }

    /// List a run's decisions joined with their catalog entries, in the
    /// order the executor walks them.
    pub async fn list_with_entries(
        pool: &PgPool,
        migration_id: DbId,
    ) -> Result<Vec<DecisionWithEntry>, sqlx::Error> {
        sqlx::query_as::<_, DecisionWithEntry>(
            "SELECT d.id AS decision_id, d.catalog_entry_id,
                    c.event_code, c.storage_key, c.filename, c.file_type,
                    c.category, c.size_bytes, c.media_type, c.needs_extraction,
                    d.action, d.new_filename, d.target_category, d.target_key
             FROM file_decisions d
             JOIN file_catalog_entries c ON c.id = d.catalog_entry_id
             WHERE d.migration_id = $1
             ORDER BY c.event_code, c.storage_key",
        )
        .bind(migration_id)
        .fetch_all(pool)
        .await
    }
}

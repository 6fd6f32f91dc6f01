//! Repository for the `migrations_runs` table.

use arkivo_core::migration::MigrationStatus;
use arkivo_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::migration_run::{CreateMigrationRun, MigrationRun, RunProgress};

/// Column list for migrations_runs queries.
const COLUMNS: &str = "id, title, manifest_key, manifest_row_count, status, analysis_summary, \
    target_bucket, processed_events, succeeded_events, failed_events, skipped_events, \
    progress_pct, analyzed_at, execution_started_at, execution_completed_at, \
    created_by, approved_by, notes, created_at, updated_at";

/// Provides CRUD operations for migration runs.
pub struct MigrationRunRepo;

impl MigrationRunRepo {
    /// Create a new run in the initial `uploaded` status.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMigrationRun,
    ) -> Result<MigrationRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO migrations_runs (title, manifest_key, target_bucket, created_by, notes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(&input.title)
            .bind(&input.manifest_key)
            .bind(&input.target_bucket)
            .bind(&input.created_by)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Find a run by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM migrations_runs WHERE id = $1");
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List runs, most recent first.
    pub async fn list(pool: &PgPool, limit: i64) -> Result<Vec<MigrationRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM migrations_runs ORDER BY created_at DESC LIMIT $1"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(limit.clamp(1, 500))
            .fetch_all(pool)
            .await
    }

    /// Compare-and-set status transition. Returns `None` when the run is
    /// no longer in `from`, so concurrent workers cannot double-apply a
    /// transition. Callers validate the transition against the state
    /// machine before persisting.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: MigrationStatus,
        to: MigrationStatus,
    ) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!(
            "UPDATE migrations_runs SET status = $3, updated_at = now()
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Store the analysis report and row count when analysis finishes.
    pub async fn set_analysis(
        pool: &PgPool,
        id: DbId,
        summary: &serde_json::Value,
        manifest_row_count: i32,
        analyzed_at: Timestamp,
    ) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!(
            "UPDATE migrations_runs SET
                analysis_summary = $2, manifest_row_count = $3,
                analyzed_at = $4, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .bind(summary)
            .bind(manifest_row_count)
            .bind(analyzed_at)
            .fetch_optional(pool)
            .await
    }

    /// Record the approving operator.
    pub async fn set_approved_by(
        pool: &PgPool,
        id: DbId,
        approved_by: &str,
    ) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!(
            "UPDATE migrations_runs SET approved_by = $2, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .bind(approved_by)
            .fetch_optional(pool)
            .await
    }

    /// Persist execution progress counters after an event group.
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        progress: &RunProgress,
    ) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!(
            "UPDATE migrations_runs SET
                processed_events = $2, succeeded_events = $3,
                failed_events = $4, skipped_events = $5,
                progress_pct = $6, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .bind(progress.processed_events)
            .bind(progress.succeeded_events)
            .bind(progress.failed_events)
            .bind(progress.skipped_events)
            .bind(progress.progress_pct)
            .fetch_optional(pool)
            .await
    }

    /// Stamp execution start.
    pub async fn mark_execution_started(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!(
            "UPDATE migrations_runs SET execution_started_at = now(), updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Stamp execution end, whatever the outcome.
    pub async fn mark_execution_completed(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!(
            "UPDATE migrations_runs SET execution_completed_at = now(), updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

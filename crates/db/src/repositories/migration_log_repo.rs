//! Repository for the append-only `migration_log_entries` table.

use arkivo_core::migration::LogSeverity;
use arkivo_core::types::DbId;
use sqlx::PgPool;

use crate::models::migration_log_entry::MigrationLogEntry;

/// Column list for migration_log_entries queries.
const COLUMNS: &str = "id, migration_id, severity, message, event_code, context, created_at";

/// Provides append/read access to the migration activity log.
pub struct MigrationLogRepo;

impl MigrationLogRepo {
    /// Append one log entry.
    pub async fn append(
        pool: &PgPool,
        migration_id: DbId,
        severity: LogSeverity,
        message: &str,
        event_code: Option<&str>,
        context: Option<&serde_json::Value>,
    ) -> Result<MigrationLogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO migration_log_entries
                (migration_id, severity, message, event_code, context)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationLogEntry>(&query)
            .bind(migration_id)
            .bind(severity.as_str())
            .bind(message)
            .bind(event_code)
            .bind(context)
            .fetch_one(pool)
            .await
    }

    /// Most recent entries for a run, newest first.
    pub async fn list_recent(
        pool: &PgPool,
        migration_id: DbId,
        limit: i64,
    ) -> Result<Vec<MigrationLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM migration_log_entries
             WHERE migration_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, MigrationLogEntry>(&query)
            .bind(migration_id)
            .bind(limit.clamp(1, 1000))
            .fetch_all(pool)
            .await
    }

    /// Entries of one severity for a run, oldest first.
    pub async fn list_by_severity(
        pool: &PgPool,
        migration_id: DbId,
        severity: LogSeverity,
    ) -> Result<Vec<MigrationLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM migration_log_entries
             WHERE migration_id = $1 AND severity = $2
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, MigrationLogEntry>(&query)
            .bind(migration_id)
            .bind(severity.as_str())
            .fetch_all(pool)
            .await
    }
}

//! Run orchestration.
//!
//! Owns the status transitions around the execution loop and the
//! cancellation path. The execution loop itself runs as an independent
//! tokio task guarded by a `CancellationToken`; cancelling the token stops
//! the loop between events, and the status lands on `cancelled`.

use std::sync::Arc;

use arkivo_core::migration::{LogSeverity, MigrationStatus};
use arkivo_core::types::DbId;
use arkivo_cloud::{ExtractionClient, ObjectStore};
use arkivo_db::models::migration_run::MigrationRun;
use arkivo_db::repositories::{MigrationLogRepo, MigrationRunRepo};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::executor::{ExecutionSummary, Executor, ExecutorConfig, ProgressSink};

/// Everything the execution task owns.
#[derive(Clone)]
pub struct ExecutionDeps {
    pub pool: PgPool,
    /// Store rooted at the staging bucket.
    pub source: Arc<dyn ObjectStore>,
    /// Store rooted at the target bucket.
    pub target: Arc<dyn ObjectStore>,
    pub extractor: Arc<dyn ExtractionClient>,
    pub config: ExecutorConfig,
}

/// Run the execution phase for an approved run, driving the status through
/// `executing` into a terminal state.
pub async fn run_execution(
    deps: ExecutionDeps,
    run_id: DbId,
    skip_events: Vec<String>,
    cancel: CancellationToken,
    mut sink: Box<dyn ProgressSink>,
) -> Result<ExecutionSummary, PipelineError> {
    let run = MigrationRunRepo::find_by_id(&deps.pool, run_id)
        .await?
        .ok_or(PipelineError::RunNotFound(run_id))?;
    let status = run
        .status()
        .ok_or_else(|| PipelineError::InvalidState(format!("Unknown status {}", run.status)))?;
    status.transition_to(MigrationStatus::Executing)?;

    MigrationRunRepo::transition(&deps.pool, run_id, status, MigrationStatus::Executing)
        .await?
        .ok_or_else(|| {
            PipelineError::InvalidState("Run status changed concurrently".to_string())
        })?;
    MigrationRunRepo::mark_execution_started(&deps.pool, run_id).await?;

    let executor = Executor {
        pool: &deps.pool,
        source: deps.source.as_ref(),
        target: deps.target.as_ref(),
        extractor: deps.extractor.as_ref(),
        config: deps.config.clone(),
    };

    let outcome = executor.run(run_id, &skip_events, &cancel, sink.as_mut()).await;
    MigrationRunRepo::mark_execution_completed(&deps.pool, run_id).await?;

    match outcome {
        Ok(summary) => {
            let terminal = if summary.cancelled {
                MigrationStatus::Cancelled
            } else if summary.succeeded == 0 && summary.failed > 0 {
                MigrationStatus::Failed
            } else {
                MigrationStatus::Completed
            };
            finish(&deps.pool, run_id, terminal, &summary).await?;
            Ok(summary)
        }
        Err(err) => {
            warn!(run_id, error = %err, "execution aborted");
            MigrationLogRepo::append(
                &deps.pool,
                run_id,
                LogSeverity::Error,
                &format!("Execution aborted: {err}"),
                None,
                None,
            )
            .await?;
            // Best effort: a concurrent cancel may already have moved it.
            let _ = MigrationRunRepo::transition(
                &deps.pool,
                run_id,
                MigrationStatus::Executing,
                MigrationStatus::Failed,
            )
            .await?;
            Err(err)
        }
    }
}

/// Spawn [`run_execution`] as its own task.
pub fn spawn_execution(
    deps: ExecutionDeps,
    run_id: DbId,
    skip_events: Vec<String>,
    cancel: CancellationToken,
    sink: Box<dyn ProgressSink>,
) -> tokio::task::JoinHandle<Result<ExecutionSummary, PipelineError>> {
    tokio::spawn(run_execution(deps, run_id, skip_events, cancel, sink))
}

/// Cancel a run from any non-terminal state. Returns the updated run; a
/// running execution loop also needs its token cancelled by the caller.
pub async fn cancel_run(pool: &PgPool, run_id: DbId) -> Result<MigrationRun, PipelineError> {
    let run = MigrationRunRepo::find_by_id(pool, run_id)
        .await?
        .ok_or(PipelineError::RunNotFound(run_id))?;
    let status = run
        .status()
        .ok_or_else(|| PipelineError::InvalidState(format!("Unknown status {}", run.status)))?;
    status.transition_to(MigrationStatus::Cancelled)?;

    let cancelled = MigrationRunRepo::transition(pool, run_id, status, MigrationStatus::Cancelled)
        .await?
        .ok_or_else(|| {
            PipelineError::InvalidState("Run status changed concurrently".to_string())
        })?;
    MigrationLogRepo::append(pool, run_id, LogSeverity::Info, "Run cancelled", None, None).await?;
    info!(run_id, from = %status, "run cancelled");
    Ok(cancelled)
}

async fn finish(
    pool: &PgPool,
    run_id: DbId,
    terminal: MigrationStatus,
    summary: &ExecutionSummary,
) -> Result<(), PipelineError> {
    // Tolerate a concurrent cancel having already moved the status.
    let moved =
        MigrationRunRepo::transition(pool, run_id, MigrationStatus::Executing, terminal).await?;
    if moved.is_none() {
        warn!(run_id, %terminal, "terminal transition skipped; status already moved");
    }
    MigrationLogRepo::append(
        pool,
        run_id,
        LogSeverity::Info,
        &format!(
            "Execution finished as {terminal}: {}/{} event(s) succeeded, {} failed, {} skipped",
            summary.succeeded, summary.processed, summary.failed, summary.skipped
        ),
        None,
        None,
    )
    .await?;
    Ok(())
}

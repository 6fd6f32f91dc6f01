//! Decision ledger service.
//!
//! Wraps the decision repository with the state-machine guards: decisions
//! may only change while the run is in a decisions-open state, and the
//! pending/complete status tracks the undecided count after every write.
//! Once a run is approved the ledger is frozen.

use arkivo_core::migration::{DecisionAction, LogSeverity, MigrationStatus};
use arkivo_core::types::DbId;
use arkivo_db::models::file_decision::{FileDecision, UpsertFileDecision};
use arkivo_db::models::migration_run::MigrationRun;
use arkivo_db::repositories::{FileCatalogRepo, FileDecisionRepo, MigrationLogRepo, MigrationRunRepo};
use sqlx::PgPool;
use tracing::info;

use crate::error::PipelineError;

/// Record one decision, keeping the run status in step.
pub async fn record_decision(
    pool: &PgPool,
    run_id: DbId,
    input: &UpsertFileDecision,
) -> Result<FileDecision, PipelineError> {
    let run = editable_run(pool, run_id).await?;
    let decision = FileDecisionRepo::upsert(pool, run_id, input).await?;
    reconcile_decision_status(pool, &run).await?;
    Ok(decision)
}

/// Record many decisions atomically, then reconcile the status once.
pub async fn record_decisions(
    pool: &PgPool,
    run_id: DbId,
    inputs: &[UpsertFileDecision],
) -> Result<Vec<FileDecision>, PipelineError> {
    let run = editable_run(pool, run_id).await?;
    let decisions = FileDecisionRepo::bulk_upsert(pool, run_id, inputs).await?;
    reconcile_decision_status(pool, &run).await?;
    Ok(decisions)
}

/// Seed the ledger from the analyzer's suggestions so review starts from
/// a complete proposal. Existing decisions are replaced.
pub async fn apply_suggestions(
    pool: &PgPool,
    run_id: DbId,
    decided_by: Option<&str>,
) -> Result<usize, PipelineError> {
    let run = editable_run(pool, run_id).await?;
    let entries = FileCatalogRepo::list_for_run(pool, run_id).await?;

    let inputs: Vec<UpsertFileDecision> = entries
        .iter()
        .filter_map(|entry| {
            let action = DecisionAction::from_str(&entry.suggested_action)?;
            Some(UpsertFileDecision {
                catalog_entry_id: entry.id,
                action,
                new_filename: None,
                target_category: entry.suggested_category.clone(),
                target_key: None,
                notes: None,
                decided_by: decided_by.map(String::from),
            })
        })
        .collect();
    let applied = FileDecisionRepo::bulk_upsert(pool, run_id, &inputs).await?.len();
    reconcile_decision_status(pool, &run).await?;

    MigrationLogRepo::append(
        pool,
        run_id,
        LogSeverity::Info,
        &format!("Applied {applied} suggested decision(s)"),
        None,
        None,
    )
    .await?;
    Ok(applied)
}

/// Approve the run, freezing the ledger. Requires every catalog entry to
/// carry a settled decision.
pub async fn approve(
    pool: &PgPool,
    run_id: DbId,
    approved_by: &str,
) -> Result<MigrationRun, PipelineError> {
    let run = MigrationRunRepo::find_by_id(pool, run_id)
        .await?
        .ok_or(PipelineError::RunNotFound(run_id))?;
    let status = run
        .status()
        .ok_or_else(|| PipelineError::InvalidState(format!("Unknown status {}", run.status)))?;
    status.transition_to(MigrationStatus::Approved)?;

    let undecided = FileCatalogRepo::count_undecided(pool, run_id).await?;
    if undecided > 0 {
        return Err(PipelineError::InvalidState(format!(
            "Cannot approve: {undecided} catalog entr(ies) still undecided"
        )));
    }

    let approved = MigrationRunRepo::transition(pool, run_id, status, MigrationStatus::Approved)
        .await?
        .ok_or_else(|| {
            PipelineError::InvalidState("Run status changed concurrently".to_string())
        })?;
    MigrationRunRepo::set_approved_by(pool, run_id, approved_by).await?;
    MigrationLogRepo::append(
        pool,
        run_id,
        LogSeverity::Info,
        &format!("Run approved by {approved_by}"),
        None,
        None,
    )
    .await?;
    info!(run_id, approved_by, "run approved");
    Ok(approved)
}

/// Load the run and refuse edits outside the decision window.
async fn editable_run(pool: &PgPool, run_id: DbId) -> Result<MigrationRun, PipelineError> {
    let run = MigrationRunRepo::find_by_id(pool, run_id)
        .await?
        .ok_or(PipelineError::RunNotFound(run_id))?;
    let status = run
        .status()
        .ok_or_else(|| PipelineError::InvalidState(format!("Unknown status {}", run.status)))?;
    if !status.decisions_open() {
        return Err(PipelineError::InvalidState(format!(
            "Decisions are frozen while the run is {status}"
        )));
    }
    Ok(run)
}

/// Flip between decisions_pending and decisions_complete based on the
/// current undecided count.
async fn reconcile_decision_status(
    pool: &PgPool,
    run: &MigrationRun,
) -> Result<(), PipelineError> {
    let undecided = FileCatalogRepo::count_undecided(pool, run.id).await?;
    let target = if undecided > 0 {
        MigrationStatus::DecisionsPending
    } else {
        MigrationStatus::DecisionsComplete
    };

    // Refresh: the upsert path may already have moved the status.
    let current = MigrationRunRepo::find_by_id(pool, run.id)
        .await?
        .ok_or(PipelineError::RunNotFound(run.id))?;
    let status = current
        .status()
        .ok_or_else(|| PipelineError::InvalidState(format!("Unknown status {}", current.status)))?;
    if status != target && status.can_transition_to(target) {
        MigrationRunRepo::transition(pool, run.id, status, target).await?;
    }
    Ok(())
}

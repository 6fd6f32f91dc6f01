//! Migration worker CLI.
//!
//! Drives a migration run end to end: create, analyze, review (suggest /
//! approve), execute with checkpointed resume, cancel, and a read-only
//! dry-run that validates a manifest against the staging bucket.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arkivo_cloud::{HttpExtractionClient, ObjectStore, S3Store};
use arkivo_core::checkpoint::RunCheckpoint;
use arkivo_core::dedup::{validate_threshold, DedupConfig};
use arkivo_core::manifest::parse_manifest;
use arkivo_db::models::migration_run::CreateMigrationRun;
use arkivo_db::repositories::{MigrationLogRepo, MigrationRunRepo};
use arkivo_pipeline::analyzer::{analyze_run, AnalyzerConfig};
use arkivo_pipeline::decisions;
use arkivo_pipeline::executor::{
    EventOutcome, EventResult, ExecutorConfig, ProgressSink, DEFAULT_EXTRACTION_DELAY,
};
use arkivo_pipeline::orchestrator::{self, ExecutionDeps};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "arkivo-worker", about = "Legacy archive migration worker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new migration run for an uploaded batch.
    Create {
        #[arg(long)]
        title: String,
        /// Manifest object key in the staging bucket.
        #[arg(long)]
        manifest: String,
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Scan, classify and catalog every event in the manifest.
    Analyze {
        #[arg(long)]
        migration_id: i64,
    },
    /// Seed the decision ledger from the analyzer's suggestions.
    Suggest {
        #[arg(long)]
        migration_id: i64,
        #[arg(long)]
        decided_by: Option<String>,
    },
    /// Approve the run, freezing the ledger.
    Approve {
        #[arg(long)]
        migration_id: i64,
        #[arg(long)]
        approved_by: String,
    },
    /// Execute an approved run.
    Execute {
        #[arg(long)]
        migration_id: i64,
        /// Resume from the checkpoint file instead of starting over.
        #[arg(long)]
        resume: bool,
        /// Checkpoint file path.
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Cancel a run from any non-terminal state.
    Cancel {
        #[arg(long)]
        migration_id: i64,
    },
    /// Tail the migration activity log.
    Logs {
        #[arg(long)]
        migration_id: i64,
        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Validate a manifest against the staging bucket without writing
    /// anything: parse, then probe every listed filename.
    DryRun {
        /// Manifest object key in the staging bucket.
        #[arg(long)]
        manifest: String,
    },
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

struct Env {
    database_url: String,
    staging_bucket: String,
    target_bucket: String,
    source_prefix: String,
    extraction_delay: Duration,
    similarity_threshold: Option<f64>,
}

impl Env {
    fn load() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let staging_bucket =
            std::env::var("ARKIVO_STAGING_BUCKET").context("ARKIVO_STAGING_BUCKET is not set")?;
        let target_bucket =
            std::env::var("ARKIVO_TARGET_BUCKET").context("ARKIVO_TARGET_BUCKET is not set")?;
        let source_prefix =
            std::env::var("ARKIVO_SOURCE_PREFIX").unwrap_or_else(|_| "events/".to_string());
        let extraction_delay = std::env::var("ARKIVO_EXTRACTION_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_EXTRACTION_DELAY);
        let similarity_threshold = std::env::var("ARKIVO_SIMILARITY_THRESHOLD")
            .ok()
            .map(|v| {
                v.parse::<f64>()
                    .context("ARKIVO_SIMILARITY_THRESHOLD is not a number")
            })
            .transpose()?;
        Ok(Self {
            database_url,
            staging_bucket,
            target_bucket,
            source_prefix,
            extraction_delay,
            similarity_threshold,
        })
    }

    fn dedup_config(&self) -> Result<DedupConfig> {
        let mut config = DedupConfig::default();
        if let Some(threshold) = self.similarity_threshold {
            validate_threshold(threshold)?;
            config.similarity_threshold = threshold;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Checkpoint sink
// ---------------------------------------------------------------------------

/// Maintains the checkpoint file during execution: successful and skipped
/// events are recorded as processed, failures are recorded for retry, and
/// the file is rewritten on the standard interval plus on every failure.
struct CheckpointSink {
    checkpoint: RunCheckpoint,
    path: PathBuf,
}

impl CheckpointSink {
    fn write(&self) {
        match self.checkpoint.to_json() {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "checkpoint write failed"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "checkpoint serialize failed"),
        }
    }
}

impl ProgressSink for CheckpointSink {
    fn event_finished(&mut self, result: &EventResult) {
        match result.outcome {
            EventOutcome::Succeeded | EventOutcome::Skipped => {
                if self.checkpoint.record_processed(result.event_code.clone()) {
                    self.write();
                }
            }
            EventOutcome::Failed => {
                self.checkpoint.record_failed(result.event_code.clone());
                self.write();
            }
        }
    }
}

impl Drop for CheckpointSink {
    fn drop(&mut self) {
        // Final rewrite so the file reflects the run end exactly.
        self.write();
    }
}

fn default_checkpoint_path(migration_id: i64) -> PathBuf {
    PathBuf::from(format!("arkivo-run-{migration_id}.checkpoint.json"))
}

fn load_checkpoint(path: &Path, migration_id: i64) -> Result<RunCheckpoint> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read checkpoint {}", path.display()))?;
    let checkpoint = RunCheckpoint::from_json(&text)?;
    if !checkpoint.matches(migration_id, "execution") {
        bail!(
            "Checkpoint {} belongs to a different run or phase",
            path.display()
        );
    }
    Ok(checkpoint)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arkivo_worker=debug,arkivo_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let env = Env::load()?;
    let pool = arkivo_db::create_pool(&env.database_url).await?;
    arkivo_db::health_check(&pool)
        .await
        .context("Database is unreachable")?;

    match cli.command {
        Command::Create {
            title,
            manifest,
            created_by,
        } => {
            let run = MigrationRunRepo::create(
                &pool,
                &CreateMigrationRun {
                    title,
                    manifest_key: manifest,
                    target_bucket: Some(env.target_bucket.clone()),
                    created_by,
                    notes: None,
                },
            )
            .await?;
            println!("Created migration run {} ({})", run.id, run.status);
        }

        Command::Analyze { migration_id } => {
            let store = S3Store::from_env(&env.staging_bucket).await?;
            let config = AnalyzerConfig {
                source_prefix: env.source_prefix.clone(),
                dedup: env.dedup_config()?,
            };
            let report = analyze_run(&pool, &store, migration_id, &config).await?;
            println!(
                "Analyzed {} event(s): {} error(s), {} warning(s), {} quarantined manifest row(s)",
                report.events.len(),
                report.error_count(),
                report.warning_count(),
                report.quarantined_rows
            );
            for issue in &report.issues {
                match &issue.event_code {
                    Some(code) => {
                        println!("  [{}] {}: {}", issue.severity.as_str(), code, issue.message)
                    }
                    None => println!("  [{}] {}", issue.severity.as_str(), issue.message),
                }
            }
        }

        Command::Suggest {
            migration_id,
            decided_by,
        } => {
            let applied =
                decisions::apply_suggestions(&pool, migration_id, decided_by.as_deref()).await?;
            println!("Applied {applied} suggested decision(s)");
        }

        Command::Approve {
            migration_id,
            approved_by,
        } => {
            let run = decisions::approve(&pool, migration_id, &approved_by).await?;
            println!("Run {} is now {}", run.id, run.status);
        }

        Command::Execute {
            migration_id,
            resume,
            checkpoint,
        } => {
            let path = checkpoint.unwrap_or_else(|| default_checkpoint_path(migration_id));
            let checkpoint = if resume {
                load_checkpoint(&path, migration_id)?
            } else {
                RunCheckpoint::new(migration_id, "execution")
            };
            let skip_events = checkpoint.processed.clone();
            if !skip_events.is_empty() {
                println!("Resuming: {} event(s) already completed", skip_events.len());
            }

            let deps = ExecutionDeps {
                pool: pool.clone(),
                source: Arc::new(S3Store::from_env(&env.staging_bucket).await?),
                target: Arc::new(S3Store::from_env(&env.target_bucket).await?),
                extractor: Arc::new(HttpExtractionClient::from_env()?),
                config: ExecutorConfig {
                    extraction_delay: env.extraction_delay,
                    ..ExecutorConfig::new(&env.staging_bucket, &env.target_bucket)
                },
            };
            let sink = CheckpointSink {
                checkpoint,
                path: path.clone(),
            };

            let cancel = CancellationToken::new();
            let mut handle = orchestrator::spawn_execution(
                deps,
                migration_id,
                skip_events,
                cancel.clone(),
                Box::new(sink),
            );

            let summary = tokio::select! {
                outcome = &mut handle => outcome.context("Execution task panicked")??,
                _ = tokio::signal::ctrl_c() => {
                    println!("Interrupt received, stopping after the current event...");
                    cancel.cancel();
                    handle.await.context("Execution task panicked")??
                }
            };
            println!(
                "Execution finished: {}/{} succeeded, {} failed, {} skipped{}",
                summary.succeeded,
                summary.processed,
                summary.failed,
                summary.skipped,
                if summary.cancelled {
                    " (cancelled; re-run with --resume to continue)"
                } else {
                    ""
                }
            );
        }

        Command::Cancel { migration_id } => {
            let run = orchestrator::cancel_run(&pool, migration_id).await?;
            println!("Run {} is now {}", run.id, run.status);
        }

        Command::Logs {
            migration_id,
            limit,
        } => {
            let entries = MigrationLogRepo::list_recent(&pool, migration_id, limit).await?;
            for entry in entries.iter().rev() {
                match &entry.event_code {
                    Some(code) => println!(
                        "{} [{}] {}: {}",
                        entry.created_at, entry.severity, code, entry.message
                    ),
                    None => {
                        println!("{} [{}] {}", entry.created_at, entry.severity, entry.message)
                    }
                }
            }
        }

        Command::DryRun { manifest } => {
            let store = S3Store::from_env(&env.staging_bucket).await?;
            dry_run(&store, &manifest, &env.source_prefix).await?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Concurrent head probes during dry-run validation.
const DRY_RUN_CONCURRENCY: usize = 16;

/// Parse the manifest and probe every listed filename with parallel HEAD
/// requests. Read-only: no catalog rows, no status changes.
async fn dry_run(store: &S3Store, manifest_key: &str, source_prefix: &str) -> Result<()> {
    let text = store.get_text(manifest_key).await?;
    let parsed = parse_manifest(&text)?;
    println!(
        "Manifest parsed: {} event(s), {} quarantined row(s)",
        parsed.rows.len(),
        parsed.quarantined.len()
    );
    for row in &parsed.quarantined {
        println!("  quarantined row {}: {}", row.row, row.reason);
    }

    let probes: Vec<(String, String)> = parsed
        .rows
        .iter()
        .flat_map(|event| {
            event
                .audio_set_a
                .iter()
                .chain(&event.audio_set_b)
                .chain(&event.transcripts)
                .chain(&event.documents)
                .map(|name| {
                    (
                        event.event_code.clone(),
                        format!("{source_prefix}{}/{name}", event.event_code),
                    )
                })
        })
        .collect();
    let total = probes.len();

    let missing: Vec<(String, String)> = futures::stream::iter(probes)
        .map(|(event, key)| async move {
            match store.head(&key).await {
                Ok(Some(_)) => None,
                Ok(None) => Some((event, key)),
                Err(e) => Some((event, format!("{key} (probe failed: {e})"))),
            }
        })
        .buffer_unordered(DRY_RUN_CONCURRENCY)
        .filter_map(|r| async move { r })
        .collect()
        .await;

    println!("Probed {total} filename(s): {} missing", missing.len());
    for (event, key) in &missing {
        println!("  {event}: {key}");
    }
    if !missing.is_empty() {
        bail!("{} manifest filename(s) not found in staging", missing.len());
    }
    Ok(())
}

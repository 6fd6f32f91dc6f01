//! Execution phase.
//!
//! Consumes the frozen decision ledger event by event: archives go through
//! the extraction function (with a fixed inter-call delay), which unpacks
//! them into the event's target prefix; loose files are server-side copies.
//! The target prefix is then inventoried, planned targets absent from the
//! listing are logged as warnings, and every object actually present
//! becomes a media file row. An event failure is logged and the run
//! continues with the next event.
//!
//! Planning ([`plan_event`]), transfer ([`transfer_event`]), verification
//! ([`missing_targets`]) and inventory ([`inventory_target`]) are separable
//! so tests can drive them against in-memory fakes without a database.

use std::collections::BTreeMap;
use std::time::Duration;

use arkivo_core::classify::{file_extension, file_type_for_extension, FileCategory, FileType};
use arkivo_core::filename::parse_track_filename;
use arkivo_core::migration::{DecisionAction, LogSeverity};
use arkivo_core::types::DbId;
use arkivo_cloud::{ExtractionClient, ExtractionRequest, ObjectStore, ObjectSummary};
use arkivo_db::models::file_decision::DecisionWithEntry;
use arkivo_db::models::media_file::CreateMediaFile;
use arkivo_db::models::migration_run::RunProgress;
use arkivo_db::repositories::{FileDecisionRepo, MediaFileRepo, MigrationLogRepo, MigrationRunRepo};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::PipelineError;

/// Default pause between extraction function calls.
pub const DEFAULT_EXTRACTION_DELAY: Duration = Duration::from_millis(2000);

/// Execution configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Bucket the staging objects live in, named in extraction requests.
    pub staging_bucket: String,
    pub target_bucket: String,
    /// Target key prefix, one directory per event underneath.
    pub target_prefix: String,
    pub extraction_delay: Duration,
}

impl ExecutorConfig {
    pub fn new(staging_bucket: impl Into<String>, target_bucket: impl Into<String>) -> Self {
        Self {
            staging_bucket: staging_bucket.into(),
            target_bucket: target_bucket.into(),
            target_prefix: "media/".to_string(),
            extraction_delay: DEFAULT_EXTRACTION_DELAY,
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// One server-side copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyOp {
    pub source_key: String,
    pub target_key: String,
}

/// One archive routed through the extraction function.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOp {
    pub archive_key: String,
    /// Target-bucket prefix the contents unpack under.
    pub target_prefix: String,
}

/// Work for one event, derived purely from its decisions.
#[derive(Debug)]
pub struct EventExecutionPlan {
    pub event_code: String,
    pub extractions: Vec<ExtractionOp>,
    pub copies: Vec<CopyOp>,
    /// Decisions excluded from migration.
    pub ignored: usize,
}

impl EventExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.extractions.is_empty() && self.copies.is_empty()
    }
}

/// Plan one event from its settled decisions.
pub fn plan_event(
    event_code: &str,
    decisions: &[DecisionWithEntry],
    config: &ExecutorConfig,
) -> EventExecutionPlan {
    let mut plan = EventExecutionPlan {
        event_code: event_code.to_string(),
        extractions: Vec::new(),
        copies: Vec::new(),
        ignored: 0,
    };

    for decision in decisions {
        match decision.action() {
            Some(DecisionAction::Include) | Some(DecisionAction::Rename) => {
                if decision.needs_extraction && decision.file_type == FileType::Archive.as_str() {
                    let category = decision
                        .target_category
                        .as_deref()
                        .unwrap_or(&decision.category);
                    plan.extractions.push(ExtractionOp {
                        archive_key: decision.storage_key.clone(),
                        target_prefix: format!(
                            "{}{}/{}/",
                            config.target_prefix, event_code, category
                        ),
                    });
                } else {
                    plan.copies.push(CopyOp {
                        source_key: decision.storage_key.clone(),
                        target_key: resolve_target_key(event_code, decision, config),
                    });
                }
            }
            // Review never reaches execution (approval requires settled
            // decisions); treat a stray one like ignore.
            Some(DecisionAction::Ignore) | Some(DecisionAction::Review) | None => {
                plan.ignored += 1;
            }
        }
    }
    plan
}

/// Target key for one decision: explicit override, else the
/// `{prefix}{event}/{category}/{filename}` convention.
fn resolve_target_key(
    event_code: &str,
    decision: &DecisionWithEntry,
    config: &ExecutorConfig,
) -> String {
    if let Some(key) = &decision.target_key {
        return key.clone();
    }
    let filename = decision
        .new_filename
        .as_deref()
        .unwrap_or(&decision.filename);
    let category = decision
        .target_category
        .as_deref()
        .unwrap_or(&decision.category);
    format!(
        "{}{}/{}/{}",
        config.target_prefix, event_code, category, filename
    )
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

/// Execute one event's cloud work: extraction calls first (spaced by the
/// configured delay), then the copies.
pub async fn transfer_event(
    source: &dyn ObjectStore,
    extractor: &dyn ExtractionClient,
    plan: &EventExecutionPlan,
    config: &ExecutorConfig,
) -> Result<(), PipelineError> {
    for (i, op) in plan.extractions.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(config.extraction_delay).await;
        }
        let outcome = extractor
            .extract(&ExtractionRequest {
                bucket: config.staging_bucket.clone(),
                key: op.archive_key.clone(),
                target_bucket: config.target_bucket.clone(),
                target_prefix: op.target_prefix.clone(),
            })
            .await?;
        if !outcome.success {
            return Err(PipelineError::Cloud(arkivo_cloud::CloudError::Extraction(
                format!("{}: {}", op.archive_key, outcome.message),
            )));
        }
    }

    for op in &plan.copies {
        source
            .copy(&op.source_key, &config.target_bucket, &op.target_key)
            .await?;
    }
    Ok(())
}

/// Planned targets absent from the post-transfer listing: every copy's
/// exact target key, and at least one object under each extraction's
/// prefix (an archive with zero extracted objects is reported as
/// `prefix*`).
pub fn missing_targets(plan: &EventExecutionPlan, present: &[ObjectSummary]) -> Vec<String> {
    let mut missing = Vec::new();
    for op in &plan.extractions {
        if !present.iter().any(|o| o.key.starts_with(&op.target_prefix)) {
            missing.push(format!("{}*", op.target_prefix));
        }
    }
    for op in &plan.copies {
        if !present.iter().any(|o| o.key == op.target_key) {
            missing.push(op.target_key.clone());
        }
    }
    missing
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Turn the target listing into media file rows. Only objects actually
/// present become rows; path convention carries the category.
pub fn inventory_target(
    event_code: &str,
    prefix: &str,
    objects: &[ObjectSummary],
    decisions: &[DecisionWithEntry],
    migration_id: DbId,
    config: &ExecutorConfig,
) -> Vec<CreateMediaFile> {
    objects
        .iter()
        .map(|obj| {
            let relative = obj.key.strip_prefix(prefix).unwrap_or(&obj.key);
            let (category, filename) = match relative.split_once('/') {
                Some((category, rest)) => {
                    (category.to_string(), rest.rsplit('/').next().unwrap_or(rest))
                }
                None => (FileCategory::Other.as_str().to_string(), relative),
            };
            let extension = file_extension(filename);
            let file_type = file_type_for_extension(&extension);

            // The decision that produced this object, matched on its
            // effective filename.
            let source = decisions.iter().find(|d| {
                d.new_filename.as_deref().unwrap_or(&d.filename) == filename
            });

            let mut media = CreateMediaFile {
                event_code: event_code.to_string(),
                file_type: file_type.as_str().to_string(),
                category: category.clone(),
                filename: filename.to_string(),
                storage_key: obj.key.clone(),
                storage_bucket: config.target_bucket.clone(),
                size_bytes: obj.size_bytes,
                media_type: source.and_then(|d| d.media_type.clone()),
                duration_secs: None,
                bitrate_kbps: None,
                codec: None,
                resolution: None,
                language: None,
                page_count: None,
                session_number: None,
                track_number: None,
                is_translation: false,
                is_legacy: category == FileCategory::AudioLegacy.as_str(),
                migration_id: Some(migration_id),
                catalog_entry_id: source.map(|d| d.catalog_entry_id),
            };
            if file_type == FileType::Audio {
                let track = parse_track_filename(filename, 0);
                media.track_number = Some(track.track_number as i32);
                media.is_translation = track.is_translation;
                media.language = Some(track.primary_language);
            }
            media
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// Outcome of one event during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct EventResult {
    pub event_code: String,
    pub outcome: EventOutcome,
    pub detail: Option<String>,
}

/// Callback invoked after each event, used by the worker to maintain its
/// checkpoint file.
pub trait ProgressSink: Send {
    fn event_finished(&mut self, result: &EventResult);
}

/// Sink that drops everything.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn event_finished(&mut self, _result: &EventResult) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// True when the run stopped on cancellation before finishing.
    pub cancelled: bool,
}

/// Dependencies for one execution run.
pub struct Executor<'a> {
    pub pool: &'a PgPool,
    /// Store rooted at the staging bucket.
    pub source: &'a dyn ObjectStore,
    /// Store rooted at the target bucket.
    pub target: &'a dyn ObjectStore,
    pub extractor: &'a dyn ExtractionClient,
    pub config: ExecutorConfig,
}

impl Executor<'_> {
    /// Walk every event group in the ledger. `skip_events` carries event
    /// codes already completed by a previous attempt; they are never
    /// re-executed.
    pub async fn run(
        &self,
        run_id: DbId,
        skip_events: &[String],
        cancel: &CancellationToken,
        sink: &mut dyn ProgressSink,
    ) -> Result<ExecutionSummary, PipelineError> {
        let decisions = FileDecisionRepo::list_with_entries(self.pool, run_id).await?;
        let mut groups: BTreeMap<String, Vec<DecisionWithEntry>> = BTreeMap::new();
        for decision in decisions {
            groups.entry(decision.event_code.clone()).or_default().push(decision);
        }
        let total = groups.len();
        info!(run_id, events = total, "execution started");

        let mut summary = ExecutionSummary::default();
        for (event_code, group) in &groups {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                info!(run_id, "execution cancelled");
                break;
            }

            let result = if skip_events.contains(event_code) {
                summary.skipped += 1;
                EventResult {
                    event_code: event_code.clone(),
                    outcome: EventOutcome::Skipped,
                    detail: Some("already completed by a previous attempt".into()),
                }
            } else {
                match self.execute_event(run_id, event_code, group).await {
                    Ok(()) => {
                        summary.succeeded += 1;
                        EventResult {
                            event_code: event_code.clone(),
                            outcome: EventOutcome::Succeeded,
                            detail: None,
                        }
                    }
                    Err(err) => {
                        error!(run_id, event = %event_code, error = %err, "event failed");
                        MigrationLogRepo::append(
                            self.pool,
                            run_id,
                            LogSeverity::Error,
                            &format!("Event execution failed: {err}"),
                            Some(event_code),
                            None,
                        )
                        .await?;
                        summary.failed += 1;
                        EventResult {
                            event_code: event_code.clone(),
                            outcome: EventOutcome::Failed,
                            detail: Some(err.to_string()),
                        }
                    }
                }
            };

            summary.processed += 1;
            MigrationRunRepo::update_progress(
                self.pool,
                run_id,
                &RunProgress {
                    processed_events: summary.processed as i32,
                    succeeded_events: summary.succeeded as i32,
                    failed_events: summary.failed as i32,
                    skipped_events: summary.skipped as i32,
                    progress_pct: if total == 0 {
                        100.0
                    } else {
                        summary.processed as f32 * 100.0 / total as f32
                    },
                },
            )
            .await?;
            sink.event_finished(&result);
        }

        info!(
            run_id,
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "execution loop finished"
        );
        Ok(summary)
    }

    async fn execute_event(
        &self,
        run_id: DbId,
        event_code: &str,
        decisions: &[DecisionWithEntry],
    ) -> Result<(), PipelineError> {
        let plan = plan_event(event_code, decisions, &self.config);
        transfer_event(self.source, self.extractor, &plan, &self.config).await?;

        let prefix = format!("{}{}/", self.config.target_prefix, event_code);
        let present = self.target.list_prefix(&prefix).await?;

        // Cross-check the listing against the plan. Copies pinned outside
        // the event prefix are probed individually.
        let mut verified = present.clone();
        for op in plan.copies.iter().filter(|op| !op.target_key.starts_with(&prefix)) {
            if let Some(meta) = self.target.head(&op.target_key).await? {
                verified.push(ObjectSummary {
                    key: meta.key,
                    size_bytes: meta.size_bytes,
                });
            }
        }
        let missing = missing_targets(&plan, &verified);
        for key in &missing {
            MigrationLogRepo::append(
                self.pool,
                run_id,
                LogSeverity::Warning,
                &format!("Expected object missing after transfer: {key}"),
                Some(event_code),
                None,
            )
            .await?;
        }

        let media =
            inventory_target(event_code, &prefix, &present, decisions, run_id, &self.config);

        // One transaction per event: no partial media rows on failure.
        let mut tx = self.pool.begin().await?;
        for row in &media {
            MediaFileRepo::upsert_in_tx(&mut tx, row).await?;
        }
        tx.commit().await?;

        MigrationLogRepo::append(
            self.pool,
            run_id,
            LogSeverity::Info,
            &format!(
                "Event migrated: {} cop(ies), {} archive(s), {} media row(s), {} ignored, {} missing",
                plan.copies.len(),
                plan.extractions.len(),
                media.len(),
                plan.ignored,
                missing.len()
            ),
            Some(event_code),
            None,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkivo_cloud::extract::ScriptedExtractor;
    use arkivo_cloud::InMemoryStore;
    use assert_matches::assert_matches;

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            extraction_delay: Duration::from_millis(0),
            ..ExecutorConfig::new("staging", "archive-media")
        }
    }

    fn decision(
        event: &str,
        key: &str,
        action: &str,
        file_type: &str,
        needs_extraction: bool,
    ) -> DecisionWithEntry {
        DecisionWithEntry {
            decision_id: 1,
            catalog_entry_id: 1,
            event_code: event.to_string(),
            storage_key: key.to_string(),
            filename: key.rsplit('/').next().unwrap().to_string(),
            file_type: file_type.to_string(),
            category: "audio_main".to_string(),
            size_bytes: Some(1000),
            media_type: None,
            needs_extraction,
            action: action.to_string(),
            new_filename: None,
            target_category: None,
            target_key: None,
        }
    }

    #[test]
    fn plan_splits_archives_copies_and_ignores() {
        let decisions = vec![
            decision("EVT-001", "events/EVT-001/001 talk.mp3", "include", "audio", false),
            decision("EVT-001", "events/EVT-001/old.zip", "include", "archive", true),
            decision("EVT-001", "events/EVT-001/Thumbs.db", "ignore", "other", false),
        ];
        let plan = plan_event("EVT-001", &decisions, &config());

        assert_eq!(
            plan.extractions,
            vec![ExtractionOp {
                archive_key: "events/EVT-001/old.zip".into(),
                target_prefix: "media/EVT-001/audio_main/".into(),
            }]
        );
        assert_eq!(plan.copies.len(), 1);
        assert_eq!(
            plan.copies[0].target_key,
            "media/EVT-001/audio_main/001 talk.mp3"
        );
        assert_eq!(plan.ignored, 1);
    }

    #[test]
    fn rename_decision_changes_target_filename() {
        let mut renamed =
            decision("EVT-001", "events/EVT-001/001 talk.mp3", "rename", "audio", false);
        renamed.new_filename = Some("001 Opening Talk.mp3".to_string());
        let plan = plan_event("EVT-001", &[renamed], &config());

        assert_eq!(
            plan.copies[0].target_key,
            "media/EVT-001/audio_main/001 Opening Talk.mp3"
        );
    }

    #[test]
    fn explicit_target_key_wins() {
        let mut pinned =
            decision("EVT-001", "events/EVT-001/001 talk.mp3", "include", "audio", false);
        pinned.target_key = Some("media/special/001.mp3".to_string());
        let plan = plan_event("EVT-001", &[pinned], &config());
        assert_eq!(plan.copies[0].target_key, "media/special/001.mp3");
    }

    #[tokio::test]
    async fn transfer_copies_loose_files() {
        let store = InMemoryStore::new();
        store.put_text("events/EVT-001/001 talk.mp3", "audio");
        let extractor = ScriptedExtractor::new();

        let decisions = vec![decision(
            "EVT-001",
            "events/EVT-001/001 talk.mp3",
            "include",
            "audio",
            false,
        )];
        let plan = plan_event("EVT-001", &decisions, &config());
        transfer_event(&store, &extractor, &plan, &config()).await.unwrap();

        assert_eq!(store.copies().len(), 1);
        assert!(extractor.calls().is_empty());
        let listed = store.list_prefix("media/EVT-001/").await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn failed_extraction_fails_the_event_only() {
        let store = InMemoryStore::new();
        store.put_text("events/EVT-001/old.zip", "zip");
        store.put_text("events/EVT-002/001 talk.mp3", "audio");
        let extractor = ScriptedExtractor::new();
        extractor.script("events/EVT-001/old.zip", false, "corrupt archive");

        let bad = plan_event(
            "EVT-001",
            &[decision("EVT-001", "events/EVT-001/old.zip", "include", "archive", true)],
            &config(),
        );
        let good = plan_event(
            "EVT-002",
            &[decision("EVT-002", "events/EVT-002/001 talk.mp3", "include", "audio", false)],
            &config(),
        );

        let err = transfer_event(&store, &extractor, &bad, &config())
            .await
            .unwrap_err();
        assert_matches!(err, PipelineError::Cloud(_));
        assert!(err.to_string().contains("corrupt archive"));

        // The failure leaves the next event untouched.
        transfer_event(&store, &extractor, &good, &config()).await.unwrap();
        assert_eq!(store.copies().len(), 1);
    }

    #[tokio::test]
    async fn extraction_unpacks_into_event_target_prefix() {
        let store = InMemoryStore::new();
        store.put_text("events/EVT-001/old.zip", "zip");
        let extractor = ScriptedExtractor::new();

        let decisions =
            vec![decision("EVT-001", "events/EVT-001/old.zip", "include", "archive", true)];
        let plan = plan_event("EVT-001", &decisions, &config());
        transfer_event(&store, &extractor, &plan, &config()).await.unwrap();

        let requests = extractor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bucket, "staging");
        assert_eq!(requests[0].key, "events/EVT-001/old.zip");
        assert_eq!(requests[0].target_bucket, "archive-media");
        assert_eq!(requests[0].target_prefix, "media/EVT-001/audio_main/");
    }

    #[test]
    fn missing_targets_flags_absent_copies_and_empty_extractions() {
        let mut pinned =
            decision("EVT-001", "events/EVT-001/001 talk.mp3", "include", "audio", false);
        pinned.target_key = Some("media/special/001.mp3".to_string());
        let archive =
            decision("EVT-001", "events/EVT-001/old.zip", "include", "archive", true);
        let plan = plan_event("EVT-001", &[pinned, archive], &config());

        let missing = missing_targets(&plan, &[]);
        assert_eq!(
            missing,
            vec!["media/EVT-001/audio_main/*", "media/special/001.mp3"]
        );

        let present = vec![
            ObjectSummary {
                key: "media/EVT-001/audio_main/track 1.mp3".into(),
                size_bytes: Some(10),
            },
            ObjectSummary {
                key: "media/special/001.mp3".into(),
                size_bytes: Some(10),
            },
        ];
        assert!(missing_targets(&plan, &present).is_empty());
    }

    #[test]
    fn inventory_builds_media_rows_by_path_convention() {
        let decisions = vec![decision(
            "EVT-001",
            "events/EVT-001/001 TRAD - Abertura.mp3",
            "include",
            "audio",
            false,
        )];
        let objects = vec![
            ObjectSummary {
                key: "media/EVT-001/audio_main/001 TRAD - Abertura.mp3".into(),
                size_bytes: Some(2000),
            },
            ObjectSummary {
                key: "media/EVT-001/audio_legacy/005 old master.mp3".into(),
                size_bytes: Some(500),
            },
        ];
        let rows = inventory_target(
            "EVT-001",
            "media/EVT-001/",
            &objects,
            &decisions,
            42,
            &config(),
        );

        assert_eq!(rows.len(), 2);
        let translation = &rows[0];
        assert_eq!(translation.category, "audio_main");
        assert!(translation.is_translation);
        assert_eq!(translation.track_number, Some(1));
        assert_eq!(translation.catalog_entry_id, Some(1));
        assert_eq!(translation.migration_id, Some(42));

        let legacy = &rows[1];
        assert!(legacy.is_legacy);
        assert_eq!(legacy.catalog_entry_id, None);
    }
}

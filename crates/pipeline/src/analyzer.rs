//! Analysis phase.
//!
//! Walks every manifest event's staging prefix, classifies each object,
//! parses track filenames, infers sessions, reconciles the parallel audio
//! sets, and writes catalog rows plus an analysis report. Planning per
//! event ([`analyze_event`]) is pure; [`analyze_run`] owns the I/O loop.
//!
//! A failed event scan is recorded as an issue and the run moves on. One
//! unreadable prefix must never abort analysis of the others.

use std::collections::HashMap;

use arkivo_core::classify::{classify_object, ExpectedManifest, FileCategory, SuggestedAction};
use arkivo_core::dedup::{reconcile_track_sets, DedupConfig};
use arkivo_core::filename::parse_track_filename;
use arkivo_core::manifest::{parse_manifest, EventRow};
use arkivo_core::migration::{LogSeverity, MigrationStatus};
use arkivo_core::report::{AnalysisReport, EventAnalysis};
use arkivo_core::session::{has_degenerate_numbering, infer_sessions, renumber_degenerate_tracks};
use arkivo_core::types::DbId;
use arkivo_cloud::{ObjectStore, ObjectSummary};
use arkivo_db::models::file_catalog_entry::CreateFileCatalogEntry;
use arkivo_db::repositories::{FileCatalogRepo, MigrationLogRepo, MigrationRunRepo};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::PipelineError;

/// Analysis configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Staging prefix holding one directory per event.
    pub source_prefix: String,
    pub dedup: DedupConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            source_prefix: "events/".to_string(),
            dedup: DedupConfig::default(),
        }
    }
}

/// Catalog rows plus summary for one event, ready to persist.
#[derive(Debug)]
pub struct EventPlan {
    pub entries: Vec<CreateFileCatalogEntry>,
    pub analysis: EventAnalysis,
}

// ---------------------------------------------------------------------------
// Pure planning
// ---------------------------------------------------------------------------

/// Plan one event's catalog from its listed objects.
pub fn analyze_event(
    event: &EventRow,
    prefix: &str,
    objects: &[ObjectSummary],
    dedup: &DedupConfig,
) -> EventPlan {
    let expected = ExpectedManifest::from_names(
        event
            .audio_set_a
            .iter()
            .chain(&event.audio_set_b)
            .chain(&event.transcripts)
            .chain(&event.documents)
            .map(|s| s.as_str()),
    );

    // Classify everything first; audio gets a second pass below.
    let classified: Vec<_> = objects
        .iter()
        .map(|obj| {
            let relative = obj.key.strip_prefix(prefix).unwrap_or(&obj.key);
            (obj, classify_object(relative, &expected))
        })
        .collect();

    // Parse main-set audio filenames and infer sessions from them.
    let mut main_tracks: Vec<_> = classified
        .iter()
        .filter(|(_, c)| c.category == FileCategory::AudioMain)
        .enumerate()
        .map(|(i, (_, c))| parse_track_filename(&c.filename, i))
        .collect();
    if has_degenerate_numbering(&main_tracks) {
        renumber_degenerate_tracks(&mut main_tracks);
    }
    let sessions = infer_sessions(&main_tracks);
    let mut session_of: HashMap<String, u32> = HashMap::new();
    for session in &sessions {
        for track in &session.tracks {
            session_of.insert(track.original_filename.to_lowercase(), session.number);
        }
    }

    // Reconcile the manifest's parallel audio lists; equivalents in the
    // non-canonical set are suggested for exclusion, the rest becomes
    // legacy audio.
    let partition = reconcile_track_sets(&event.audio_set_a, &event.audio_set_b, dedup);
    let duplicate_names: Vec<String> =
        partition.duplicates.iter().map(|n| n.to_lowercase()).collect();
    let legacy_names: Vec<String> = partition.legacy.iter().map(|n| n.to_lowercase()).collect();

    let mut analysis = EventAnalysis {
        event_code: event.event_code.clone(),
        object_count: objects.len(),
        session_count: sessions.len(),
        duplicate_count: partition.duplicates.len(),
        ..Default::default()
    };

    let mut entries = Vec::with_capacity(classified.len());
    let mut seen_names: Vec<String> = Vec::new();
    let mut audio_position = 0usize;

    for (obj, c) in &classified {
        seen_names.push(c.filename.to_lowercase());
        let lower = c.filename.to_lowercase();

        let mut suggested_action = c.suggested_action;
        let mut suggested_category = None;
        let mut conflicts = None;
        if duplicate_names.contains(&lower) {
            suggested_action = SuggestedAction::Ignore;
            conflicts = Some(serde_json::json!({
                "duplicate": true,
                "detail": "equivalent track present in the canonical audio set",
            }));
        } else if legacy_names.contains(&lower) {
            suggested_category = Some(FileCategory::AudioLegacy.as_str().to_string());
        }

        let metadata = if c.file_type.as_str() == "audio" {
            let track = parse_track_filename(&c.filename, audio_position);
            audio_position += 1;
            let session_number = session_of.get(&lower).copied();
            Some(serde_json::json!({
                "track": track,
                "session_number": session_number,
            }))
        } else {
            None
        };

        match suggested_action {
            SuggestedAction::Include => analysis.included += 1,
            SuggestedAction::Ignore => analysis.ignored += 1,
            SuggestedAction::Review => analysis.needs_review += 1,
        }

        entries.push(CreateFileCatalogEntry {
            event_code: event.event_code.clone(),
            storage_key: obj.key.clone(),
            filename: c.filename.clone(),
            directory: c.directory.clone(),
            file_type: c.file_type.as_str().to_string(),
            category: c.category.as_str().to_string(),
            extension: (!c.extension.is_empty()).then(|| c.extension.clone()),
            size_bytes: obj.size_bytes,
            media_type: None,
            suggested_action: suggested_action.as_str().to_string(),
            suggested_category,
            conflicts,
            metadata,
            matched_manifest: c.matched_manifest,
            needs_extraction: c.needs_extraction,
        });
    }

    // Manifest names with no matching object, audio sets and attachments
    // alike.
    analysis.missing_from_bucket = event
        .audio_set_a
        .iter()
        .chain(&event.audio_set_b)
        .chain(&event.transcripts)
        .chain(&event.documents)
        .filter(|name| !seen_names.contains(&name.to_lowercase()))
        .cloned()
        .collect();

    EventPlan { entries, analysis }
}

// ---------------------------------------------------------------------------
// I/O driver
// ---------------------------------------------------------------------------

/// Run the full analysis phase for one migration.
pub async fn analyze_run(
    pool: &PgPool,
    store: &dyn ObjectStore,
    run_id: DbId,
    config: &AnalyzerConfig,
) -> Result<AnalysisReport, PipelineError> {
    let run = MigrationRunRepo::find_by_id(pool, run_id)
        .await?
        .ok_or(PipelineError::RunNotFound(run_id))?;
    let status = run
        .status()
        .ok_or_else(|| PipelineError::InvalidState(format!("Unknown status {}", run.status)))?;
    status.transition_to(MigrationStatus::Analyzing)?;

    MigrationRunRepo::transition(pool, run_id, status, MigrationStatus::Analyzing)
        .await?
        .ok_or_else(|| {
            PipelineError::InvalidState("Run status changed concurrently".to_string())
        })?;
    info!(run_id, manifest = %run.manifest_key, "analysis started");

    let manifest_text = store.get_text(&run.manifest_key).await?;
    let parsed = parse_manifest(&manifest_text)?;

    let mut report = AnalysisReport::new(run_id);
    report.record_quarantined(&parsed.quarantined);

    for event in &parsed.rows {
        let prefix = format!("{}{}/", config.source_prefix, event.event_code);
        match scan_event(pool, store, run_id, event, &prefix, &config.dedup).await {
            Ok(analysis) => report.push_event(analysis),
            Err(err) => {
                warn!(run_id, event = %event.event_code, error = %err, "event scan failed");
                MigrationLogRepo::append(
                    pool,
                    run_id,
                    LogSeverity::Error,
                    &format!("Event scan failed: {err}"),
                    Some(&event.event_code),
                    None,
                )
                .await?;
                report.push_event(EventAnalysis {
                    event_code: event.event_code.clone(),
                    scan_failed: true,
                    ..Default::default()
                });
            }
        }
    }

    // Objects under the staging prefix claimed by no manifest event.
    match store.list_prefix(&config.source_prefix).await {
        Ok(all) => {
            let claimed: Vec<String> = parsed
                .rows
                .iter()
                .map(|e| format!("{}{}/", config.source_prefix, e.event_code))
                .collect();
            let unmapped = all
                .into_iter()
                .map(|o| o.key)
                .filter(|k| !claimed.iter().any(|p| k.starts_with(p.as_str())))
                .collect();
            report.record_unmapped(unmapped);
        }
        Err(err) => {
            warn!(run_id, error = %err, "unmapped-object sweep failed");
        }
    }

    let summary = serde_json::to_value(&report)
        .map_err(|e| PipelineError::InvalidState(format!("Unserializable report: {e}")))?;
    MigrationRunRepo::set_analysis(
        pool,
        run_id,
        &summary,
        parsed.rows.len() as i32,
        chrono::Utc::now(),
    )
    .await?;
    MigrationRunRepo::transition(pool, run_id, MigrationStatus::Analyzing, MigrationStatus::Analyzed)
        .await?;

    // Every run has undecided rows right after analysis unless the catalog
    // came out empty.
    let undecided = FileCatalogRepo::count_undecided(pool, run_id).await?;
    let next = if undecided > 0 {
        MigrationStatus::DecisionsPending
    } else {
        MigrationStatus::DecisionsComplete
    };
    MigrationRunRepo::transition(pool, run_id, MigrationStatus::Analyzed, next).await?;

    MigrationLogRepo::append(
        pool,
        run_id,
        LogSeverity::Info,
        &format!(
            "Analysis finished: {} event(s), {} issue(s)",
            report.events.len(),
            report.issues.len()
        ),
        None,
        None,
    )
    .await?;
    info!(run_id, events = report.events.len(), undecided, "analysis finished");

    Ok(report)
}

async fn scan_event(
    pool: &PgPool,
    store: &dyn ObjectStore,
    run_id: DbId,
    event: &EventRow,
    prefix: &str,
    dedup: &DedupConfig,
) -> Result<EventAnalysis, PipelineError> {
    let objects = store.list_prefix(prefix).await?;
    let plan = analyze_event(event, prefix, &objects, dedup);

    let mut tx = pool.begin().await?;
    FileCatalogRepo::insert_event_batch(&mut tx, run_id, &plan.entries).await?;
    tx.commit().await?;

    Ok(plan.analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(code: &str, set_a: &[&str], set_b: &[&str]) -> EventRow {
        EventRow {
            event_code: code.to_string(),
            title: None,
            teacher: None,
            place: None,
            category: None,
            audience: None,
            audio_set_a: set_a.iter().map(|s| s.to_string()).collect(),
            audio_set_b: set_b.iter().map(|s| s.to_string()).collect(),
            expected_tracks_a: None,
            expected_tracks_b: None,
            transcripts: Vec::new(),
            documents: Vec::new(),
        }
    }

    fn objects(prefix: &str, names: &[&str]) -> Vec<ObjectSummary> {
        names
            .iter()
            .map(|n| ObjectSummary {
                key: format!("{prefix}{n}"),
                size_bytes: Some(1000),
            })
            .collect()
    }

    #[test]
    fn junk_files_suggested_ignore_others_include() {
        let event = event("EVT-001", &["001 JKR - Opening.mp3"], &[]);
        let prefix = "events/EVT-001/";
        let objs = objects(
            prefix,
            &["001 JKR - Opening.mp3", ".DS_Store", "Thumbs.db", "notes.pdf"],
        );
        let plan = analyze_event(&event, prefix, &objs, &DedupConfig::default());

        assert_eq!(plan.analysis.object_count, 4);
        assert_eq!(plan.analysis.ignored, 2);
        assert_eq!(plan.analysis.included, 2);
        let junk: Vec<_> = plan
            .entries
            .iter()
            .filter(|e| e.suggested_action == "ignore")
            .map(|e| e.filename.as_str())
            .collect();
        assert_eq!(junk, vec![".DS_Store", "Thumbs.db"]);
    }

    #[test]
    fn duplicate_translations_suggested_ignore() {
        let event = event(
            "EVT-002",
            &["001 JKR - Opening.mp3", "002 JKR - Practice.mp3"],
            &["001a TRAD - Abertura.mp3"],
        );
        let prefix = "events/EVT-002/";
        let objs = objects(
            prefix,
            &[
                "001 JKR - Opening.mp3",
                "002 JKR - Practice.mp3",
                "001a TRAD - Abertura.mp3",
            ],
        );
        let plan = analyze_event(&event, prefix, &objs, &DedupConfig::default());

        assert_eq!(plan.analysis.duplicate_count, 1);
        let dup = plan
            .entries
            .iter()
            .find(|e| e.filename == "001a TRAD - Abertura.mp3")
            .unwrap();
        assert_eq!(dup.suggested_action, "ignore");
        assert!(dup.conflicts.is_some());
    }

    #[test]
    fn unmatched_second_set_routed_to_legacy() {
        let event = event(
            "EVT-003",
            &["001 talk.mp3"],
            &["099 bonus interview.mp3"],
        );
        let prefix = "events/EVT-003/";
        let objs = objects(prefix, &["001 talk.mp3", "099 bonus interview.mp3"]);
        let plan = analyze_event(&event, prefix, &objs, &DedupConfig::default());

        let legacy = plan
            .entries
            .iter()
            .find(|e| e.filename == "099 bonus interview.mp3")
            .unwrap();
        assert_eq!(legacy.suggested_category.as_deref(), Some("audio_legacy"));
        assert_eq!(legacy.suggested_action, "include");
    }

    #[test]
    fn missing_manifest_names_reported() {
        let event = event("EVT-004", &["001 talk.mp3", "002 talk.mp3"], &[]);
        let prefix = "events/EVT-004/";
        let objs = objects(prefix, &["001 talk.mp3"]);
        let plan = analyze_event(&event, prefix, &objs, &DedupConfig::default());

        assert_eq!(plan.analysis.missing_from_bucket, vec!["002 talk.mp3"]);
    }

    #[test]
    fn sessions_inferred_from_main_set() {
        let event = event(
            "EVT-005",
            &["20230615_AM_Part 1.mp3", "20230615_PM_Part 1.mp3"],
            &[],
        );
        let prefix = "events/EVT-005/";
        let objs = objects(prefix, &["20230615_AM_Part 1.mp3", "20230615_PM_Part 1.mp3"]);
        let plan = analyze_event(&event, prefix, &objs, &DedupConfig::default());

        assert_eq!(plan.analysis.session_count, 2);
        let meta = plan.entries[0].metadata.as_ref().unwrap();
        assert_eq!(meta["session_number"], serde_json::json!(1));
    }

    #[test]
    fn archives_flagged_but_included() {
        let event = event("EVT-006", &["001 talk.mp3"], &[]);
        let prefix = "events/EVT-006/";
        let objs = objects(prefix, &["001 talk.mp3", "old_masters.zip"]);
        let plan = analyze_event(&event, prefix, &objs, &DedupConfig::default());

        let archive = plan
            .entries
            .iter()
            .find(|e| e.filename == "old_masters.zip")
            .unwrap();
        assert!(archive.needs_extraction);
        assert_eq!(archive.file_type, "archive");
    }
}

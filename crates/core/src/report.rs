//! Analysis report assembly.
//!
//! The analyzer produces one report per run: a per-event breakdown plus
//! cross-cutting issues (unmapped objects, manifest entries never found in
//! the bucket, quarantined rows). The report is stored as JSON on the run
//! row and rendered by the worker; this module owns only the shape and the
//! aggregation rules.

use serde::{Deserialize, Serialize};

use crate::manifest::QuarantinedRow;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Info => "info",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Error => "error",
        }
    }
}

/// One finding surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    /// Event code the issue belongs to, when scoped.
    pub event_code: Option<String>,
    pub message: String,
}

impl Issue {
    pub fn event(severity: IssueSeverity, event_code: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            event_code: Some(event_code.to_string()),
            message: message.into(),
        }
    }

    pub fn global(severity: IssueSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            event_code: None,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-event analysis
// ---------------------------------------------------------------------------

/// Summary of one event's scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventAnalysis {
    pub event_code: String,
    pub object_count: usize,
    pub included: usize,
    pub ignored: usize,
    pub needs_review: usize,
    pub session_count: usize,
    pub duplicate_count: usize,
    /// Manifest filenames that never matched a bucket object.
    pub missing_from_bucket: Vec<String>,
    /// Whether the scan of this event failed; the rest of the fields are
    /// then partial.
    pub scan_failed: bool,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub migration_run_id: DbId,
    pub generated_at: Timestamp,
    pub events: Vec<EventAnalysis>,
    /// Objects under no manifest event prefix.
    pub unmapped_objects: Vec<String>,
    pub quarantined_rows: usize,
    pub issues: Vec<Issue>,
}

impl AnalysisReport {
    pub fn new(migration_run_id: DbId) -> Self {
        Self {
            migration_run_id,
            generated_at: chrono::Utc::now(),
            events: Vec::new(),
            unmapped_objects: Vec::new(),
            quarantined_rows: 0,
            issues: Vec::new(),
        }
    }

    /// Fold one event's analysis in, deriving the standard issues.
    pub fn push_event(&mut self, analysis: EventAnalysis) {
        if analysis.scan_failed {
            self.issues.push(Issue::event(
                IssueSeverity::Error,
                &analysis.event_code,
                "Event scan failed; results are partial",
            ));
        }
        for name in &analysis.missing_from_bucket {
            self.issues.push(Issue::event(
                IssueSeverity::Warning,
                &analysis.event_code,
                format!("Manifest lists {name} but no matching object was found"),
            ));
        }
        if analysis.needs_review > 0 {
            self.issues.push(Issue::event(
                IssueSeverity::Info,
                &analysis.event_code,
                format!("{} object(s) need manual review", analysis.needs_review),
            ));
        }
        self.events.push(analysis);
    }

    pub fn record_quarantined(&mut self, rows: &[QuarantinedRow]) {
        self.quarantined_rows += rows.len();
        for row in rows {
            self.issues.push(Issue::global(
                IssueSeverity::Warning,
                format!("Manifest row {} quarantined: {}", row.row, row.reason),
            ));
        }
    }

    pub fn record_unmapped(&mut self, keys: Vec<String>) {
        if !keys.is_empty() {
            self.issues.push(Issue::global(
                IssueSeverity::Warning,
                format!("{} object(s) belong to no manifest event", keys.len()),
            ));
        }
        self.unmapped_objects = keys;
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .count()
    }

    /// Events whose scan failed, for retry tooling.
    pub fn failed_events(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.scan_failed)
            .map(|e| e.event_code.as_str())
            .collect()
    }
}

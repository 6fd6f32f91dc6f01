//! Migration run lifecycle.
//!
//! A run moves through a fixed state machine; every transition is validated
//! here before anything is persisted. Cancellation is allowed from any
//! non-terminal state. Decision edits are only allowed while the run is in
//! a decisions-open state; once approved the ledger is frozen.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

/// Status of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Source objects landed in the staging bucket; nothing scanned yet.
    Uploaded,
    /// Analysis in progress.
    Analyzing,
    /// Analysis finished; catalog and report available.
    Analyzed,
    /// At least one catalog entry still lacks a decision.
    DecisionsPending,
    /// Every catalog entry has a decision.
    DecisionsComplete,
    /// Operator approved; ledger frozen, execution may start.
    Approved,
    /// Execution in progress.
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl MigrationStatus {
    pub const ALL: &'static [MigrationStatus] = &[
        MigrationStatus::Uploaded,
        MigrationStatus::Analyzing,
        MigrationStatus::Analyzed,
        MigrationStatus::DecisionsPending,
        MigrationStatus::DecisionsComplete,
        MigrationStatus::Approved,
        MigrationStatus::Executing,
        MigrationStatus::Completed,
        MigrationStatus::Failed,
        MigrationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Uploaded => "uploaded",
            MigrationStatus::Analyzing => "analyzing",
            MigrationStatus::Analyzed => "analyzed",
            MigrationStatus::DecisionsPending => "decisions_pending",
            MigrationStatus::DecisionsComplete => "decisions_complete",
            MigrationStatus::Approved => "approved",
            MigrationStatus::Executing => "executing",
            MigrationStatus::Completed => "completed",
            MigrationStatus::Failed => "failed",
            MigrationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationStatus::Completed | MigrationStatus::Failed | MigrationStatus::Cancelled
        )
    }

    /// Whether the decision ledger may still be edited in this state.
    pub fn decisions_open(&self) -> bool {
        matches!(
            self,
            MigrationStatus::Analyzed
                | MigrationStatus::DecisionsPending
                | MigrationStatus::DecisionsComplete
        )
    }

    /// Valid forward transitions. Cancellation is reachable from any
    /// non-terminal state and handled separately.
    pub fn can_transition_to(&self, next: MigrationStatus) -> bool {
        if next == MigrationStatus::Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (MigrationStatus::Uploaded, MigrationStatus::Analyzing)
                | (MigrationStatus::Analyzing, MigrationStatus::Analyzed)
                | (MigrationStatus::Analyzing, MigrationStatus::Failed)
                | (MigrationStatus::Analyzed, MigrationStatus::DecisionsPending)
                | (MigrationStatus::Analyzed, MigrationStatus::DecisionsComplete)
                | (MigrationStatus::DecisionsPending, MigrationStatus::DecisionsComplete)
                | (MigrationStatus::DecisionsComplete, MigrationStatus::DecisionsPending)
                | (MigrationStatus::DecisionsComplete, MigrationStatus::Approved)
                | (MigrationStatus::Approved, MigrationStatus::Executing)
                | (MigrationStatus::Executing, MigrationStatus::Completed)
                | (MigrationStatus::Executing, MigrationStatus::Failed)
        )
    }

    /// Validate a transition, for callers persisting the change.
    pub fn transition_to(&self, next: MigrationStatus) -> Result<MigrationStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Operator decision recorded against one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Migrate the object as classified.
    Include,
    /// Skip the object entirely.
    Ignore,
    /// Migrate under an operator-supplied target name.
    Rename,
    /// Flagged for a second look; blocks approval.
    Review,
}

impl DecisionAction {
    pub const ALL: &'static [DecisionAction] = &[
        DecisionAction::Include,
        DecisionAction::Ignore,
        DecisionAction::Rename,
        DecisionAction::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Include => "include",
            DecisionAction::Ignore => "ignore",
            DecisionAction::Rename => "rename",
            DecisionAction::Review => "review",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    /// Review entries count as undecided for approval purposes.
    pub fn is_settled(&self) -> bool {
        !matches!(self, DecisionAction::Review)
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Log severity
// ---------------------------------------------------------------------------

/// Severity of a migration log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

impl LogSeverity {
    pub const ALL: &'static [LogSeverity] =
        &[LogSeverity::Info, LogSeverity::Warning, LogSeverity::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogSeverity::Info => "info",
            LogSeverity::Warning => "warning",
            LogSeverity::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

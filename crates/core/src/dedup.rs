//! Reconciliation of the two parallel audio track sets recorded for one
//! event.
//!
//! The larger set becomes canonical by default; every item of the smaller
//! set is either a duplicate of a canonical track (dropped) or unique
//! legacy content (kept under a legacy category rather than lost). The
//! similarity threshold and the larger-list heuristic were tuned against
//! one specific legacy corpus, so both are exposed as configuration, not
//! constants. When uncertain, the scoring is biased toward keeping content.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::filename::strip_extension;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default similarity threshold: at or above this, a track from the
/// non-canonical set is considered a duplicate.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

pub const MIN_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const MAX_SIMILARITY_THRESHOLD: f64 = 1.0;

/// Tunable parameters of the reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Equivalence threshold. Lower drops more near-duplicates, higher
    /// keeps more unique-looking content.
    pub similarity_threshold: f64,
    /// Whether the larger of the two sets becomes canonical (set A wins
    /// ties). When false, set A is always canonical.
    pub prefer_larger_canonical: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            prefer_larger_canonical: true,
        }
    }
}

/// Validate that `threshold` is within the accepted range.
pub fn validate_threshold(threshold: f64) -> Result<(), CoreError> {
    if !(MIN_SIMILARITY_THRESHOLD..=MAX_SIMILARITY_THRESHOLD).contains(&threshold) {
        return Err(CoreError::Validation(format!(
            "Similarity threshold must be between {MIN_SIMILARITY_THRESHOLD} and {MAX_SIMILARITY_THRESHOLD}, got {threshold}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9]{1,4})([a-zA-Z])?[\s_\-\.]*").expect("valid regex"));

static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9à-ÿ]+").expect("valid regex"));

/// Normalize a track filename for comparison: strip the extension,
/// bracketed markers, translation tokens, and the leading track number,
/// then lowercase and collapse separators.
pub fn normalize_track_name(name: &str) -> String {
    let stem = strip_extension(name);
    let no_brackets = BRACKET_RE.replace_all(stem, " ");
    let no_number = LEADING_NUMBER_RE.replace(&no_brackets, "");
    let lower = no_number.to_lowercase();
    let tokens: Vec<&str> = NON_ALNUM_RE
        .split(&lower)
        .filter(|t| !t.is_empty() && *t != "trad")
        .collect();
    tokens.join(" ")
}

/// Leading track number of a filename, with any letter suffix dropped
/// (`"001a ..."` → `1`). Tracks sharing a non-zero number across the two
/// sets are the legacy original/translation pairing convention and are
/// treated as equivalent regardless of title language.
pub fn leading_track_number(name: &str) -> Option<u32> {
    LEADING_NUMBER_RE
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
        .filter(|n| *n > 0)
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

/// Similarity score between two normalized names, in `[0.0, 1.0]`.
///
/// Exact match scores 1.0; substring containment scores the length ratio;
/// otherwise the token-overlap (Jaccard) ratio. Symmetric by construction.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if longer.contains(shorter) {
        return shorter.len() as f64 / longer.len() as f64;
    }

    let tokens_a: std::collections::HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: std::collections::HashSet<&str> = b.split_whitespace().collect();
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Three-way partition of two parallel track lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupPartition {
    /// The canonical/main list, kept in full.
    pub canonical: Vec<String>,
    /// Items of the non-canonical list with no canonical equivalent,
    /// routed to the legacy category rather than lost.
    pub legacy: Vec<String>,
    /// Items of the non-canonical list judged equivalent to a canonical
    /// item; dropped from migration.
    pub duplicates: Vec<String>,
    /// True when set B was chosen as canonical.
    pub canonical_is_set_b: bool,
}

/// Reconcile two parallel filename lists into canonical/legacy/duplicate.
///
/// Every item of the non-canonical list appears in exactly one of
/// `legacy` or `duplicates`.
pub fn reconcile_track_sets(set_a: &[String], set_b: &[String], config: &DedupConfig) -> DedupPartition {
    let canonical_is_set_b = config.prefer_larger_canonical && set_b.len() > set_a.len();
    let (canonical_set, other_set) = if canonical_is_set_b {
        (set_b, set_a)
    } else {
        (set_a, set_b)
    };

    let canonical_normalized: Vec<String> = canonical_set
        .iter()
        .map(|n| normalize_track_name(n))
        .collect();
    let canonical_numbers: Vec<Option<u32>> = canonical_set
        .iter()
        .map(|n| leading_track_number(n))
        .collect();

    let mut legacy = Vec::new();
    let mut duplicates = Vec::new();

    for item in other_set {
        let number = leading_track_number(item);
        let number_match = number
            .map(|n| canonical_numbers.iter().any(|c| *c == Some(n)))
            .unwrap_or(false);

        let has_equivalent = number_match || {
            let normalized = normalize_track_name(item);
            canonical_normalized
                .iter()
                .any(|c| similarity(&normalized, c) >= config.similarity_threshold)
        };

        if has_equivalent {
            duplicates.push(item.clone());
        } else {
            legacy.push(item.clone());
        }
    }

    DedupPartition {
        canonical: canonical_set.to_vec(),
        legacy,
        duplicates,
        canonical_is_set_b,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

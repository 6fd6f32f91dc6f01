//! Reference map cache.
//!
//! Catalog and media rows refer to canonical entities (teachers, places,
//! categories) by database id, while manifests carry legacy text codes.
//! The mapping is loaded from the database and cached here with a TTL so
//! the analyzer does not hit the lookup tables per object. The clock is
//! passed in by the caller, which keeps expiry testable.

use std::collections::HashMap;
use std::time::Duration;

use crate::types::{DbId, Timestamp};

/// Kinds of canonical entities a legacy code can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Teacher,
    Place,
    Category,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Teacher => "teacher",
            ReferenceKind::Place => "place",
            ReferenceKind::Category => "category",
        }
    }
}

/// TTL cache over the code-to-id mapping.
#[derive(Debug)]
pub struct ReferenceCache {
    ttl: Duration,
    loaded_at: Option<Timestamp>,
    entries: HashMap<(ReferenceKind, String), DbId>,
    /// Codes asked for but not found, kept for the analysis report.
    misses: Vec<(ReferenceKind, String)>,
}

fn normalize(code: &str) -> String {
    code.trim().to_lowercase()
}

impl ReferenceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            loaded_at: None,
            entries: HashMap::new(),
            misses: Vec::new(),
        }
    }

    /// Whether the caller must reload before resolving.
    pub fn is_stale(&self, now: Timestamp) -> bool {
        match self.loaded_at {
            None => true,
            Some(loaded) => {
                let age = now.signed_duration_since(loaded);
                age.to_std().map(|age| age >= self.ttl).unwrap_or(true)
            }
        }
    }

    /// Replace the cached mapping wholesale. Recorded misses are kept so
    /// a mid-run reload does not lose report data.
    pub fn replace(
        &mut self,
        entries: impl IntoIterator<Item = (ReferenceKind, String, DbId)>,
        now: Timestamp,
    ) {
        self.entries = entries
            .into_iter()
            .map(|(kind, code, id)| ((kind, normalize(&code)), id))
            .collect();
        self.loaded_at = Some(now);
    }

    /// Drop the cached mapping; the next `is_stale` returns true.
    pub fn invalidate(&mut self) {
        self.loaded_at = None;
        self.entries.clear();
    }

    /// Resolve a legacy code, case-insensitively. Unknown codes are
    /// recorded once per (kind, code) pair.
    pub fn resolve(&mut self, kind: ReferenceKind, code: &str) -> Option<DbId> {
        let key = (kind, normalize(code));
        match self.entries.get(&key) {
            Some(id) => Some(*id),
            None => {
                if !self.misses.contains(&key) {
                    self.misses.push(key);
                }
                None
            }
        }
    }

    /// Unresolved (kind, code) pairs seen so far, in first-seen order.
    pub fn unresolved(&self) -> &[(ReferenceKind, String)] {
        &self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn loaded_cache(now: Timestamp) -> ReferenceCache {
        let mut cache = ReferenceCache::new(Duration::from_secs(300));
        cache.replace(
            [
                (ReferenceKind::Teacher, "JKR".to_string(), 11),
                (ReferenceKind::Place, "Lisbon".to_string(), 22),
            ],
            now,
        );
        cache
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let now = Utc::now();
        let mut cache = loaded_cache(now);
        assert_eq!(cache.resolve(ReferenceKind::Teacher, "jkr"), Some(11));
        assert_eq!(cache.resolve(ReferenceKind::Place, " LISBON "), Some(22));
    }

    #[test]
    fn kinds_do_not_collide() {
        let now = Utc::now();
        let mut cache = loaded_cache(now);
        assert_eq!(cache.resolve(ReferenceKind::Category, "JKR"), None);
    }

    #[test]
    fn misses_recorded_once() {
        let now = Utc::now();
        let mut cache = loaded_cache(now);
        cache.resolve(ReferenceKind::Teacher, "XYZ");
        cache.resolve(ReferenceKind::Teacher, "xyz");
        cache.resolve(ReferenceKind::Place, "XYZ");

        assert_eq!(cache.unresolved().len(), 2);
    }

    #[test]
    fn stale_after_ttl() {
        let now = Utc::now();
        let cache = loaded_cache(now);
        assert!(!cache.is_stale(now + chrono::Duration::seconds(299)));
        assert!(cache.is_stale(now + chrono::Duration::seconds(300)));
    }

    #[test]
    fn fresh_cache_is_stale_until_loaded() {
        let cache = ReferenceCache::new(Duration::from_secs(300));
        assert!(cache.is_stale(Utc::now()));
    }

    #[test]
    fn invalidate_forces_reload() {
        let now = Utc::now();
        let mut cache = loaded_cache(now);
        cache.invalidate();
        assert!(cache.is_stale(now));
        assert_eq!(cache.resolve(ReferenceKind::Teacher, "JKR"), None);
    }

    #[test]
    fn clock_skew_counts_as_stale() {
        let now = Utc::now();
        let cache = loaded_cache(now);
        // loaded_at in the future relative to the probe time
        assert!(cache.is_stale(now - chrono::Duration::seconds(5)));
    }
}

//! Session inference: grouping one event's track descriptors into ordered
//! recording sessions.
//!
//! Tracks are grouped by their `(date, period, part)` key. When no track
//! carries an explicit session marker the whole set collapses into a single
//! default session. Chronological order (date, then morning < afternoon <
//! evening < unspecified, then part) determines session numbering.
//!
//! A separate renumbering pass repairs degenerate track numbering inherited
//! from the legacy corpus (duplicate non-zero numbers within one language,
//! all-zero numbers, or numbers that are really mis-parsed dates). This is a
//! deliberate escape hatch for malformed legacy data, not a general policy:
//! well-formed sets are never renumbered.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::filename::{DayPeriod, TrackDescriptor};

// ---------------------------------------------------------------------------
// Session key
// ---------------------------------------------------------------------------

/// Grouping key for session inference.
///
/// Within one event, no two sessions may silently claim the same key; the
/// only multi-track collapse is the explicit default group (all-`None` key)
/// used when no descriptor carries session markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub date: Option<NaiveDate>,
    pub period: Option<DayPeriod>,
    pub part: Option<u32>,
}

impl SessionKey {
    pub fn of(track: &TrackDescriptor) -> Self {
        Self {
            date: track.date,
            period: track.period,
            part: track.part,
        }
    }

    pub fn is_default(&self) -> bool {
        self.date.is_none() && self.period.is_none() && self.part.is_none()
    }

    /// Ordering tuple: date first (undated last), then period rank
    /// (unspecified after evening), then part (unmarked first).
    fn sort_key(&self) -> (u8, NaiveDate, u8, u32) {
        let date_flag = u8::from(self.date.is_none());
        let date = self.date.unwrap_or(NaiveDate::MAX);
        let period = self.period.map(|p| p.rank()).unwrap_or(3);
        let part = self.part.unwrap_or(0);
        (date_flag, date, period, part)
    }
}

// ---------------------------------------------------------------------------
// Inferred session
// ---------------------------------------------------------------------------

/// One inferred session: an ordered slice of an event's recordings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferredSession {
    /// Sequential number within the event, starting at 1.
    pub number: u32,
    pub date: Option<NaiveDate>,
    pub period: Option<DayPeriod>,
    pub part: Option<u32>,
    /// Tracks assigned to this session, in original filename order.
    pub tracks: Vec<TrackDescriptor>,
}

/// Group one audio set's track descriptors into ordered sessions.
///
/// Falls back to a single default session when no descriptor carries any
/// explicit session marker. Regrouping the same input is stable: numbering
/// is sequential in chronological key order and track order is preserved.
pub fn infer_sessions(tracks: &[TrackDescriptor]) -> Vec<InferredSession> {
    if tracks.is_empty() {
        return Vec::new();
    }

    let any_marker = tracks.iter().any(|t| !SessionKey::of(t).is_default());
    if !any_marker {
        return vec![InferredSession {
            number: 1,
            date: None,
            period: None,
            part: None,
            tracks: tracks.to_vec(),
        }];
    }

    let mut groups: BTreeMap<(u8, NaiveDate, u8, u32), (SessionKey, Vec<TrackDescriptor>)> =
        BTreeMap::new();
    for track in tracks {
        let key = SessionKey::of(track);
        groups
            .entry(key.sort_key())
            .or_insert_with(|| (key, Vec::new()))
            .1
            .push(track.clone());
    }

    groups
        .into_values()
        .enumerate()
        .map(|(i, (key, tracks))| InferredSession {
            number: i as u32 + 1,
            date: key.date,
            period: key.period,
            part: key.part,
            tracks,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Degenerate track renumbering
// ---------------------------------------------------------------------------

/// Track numbers at or above this value are mis-parsed dates, not numbers.
const DATE_LIKE_NUMBER: u32 = 1_000_000;

/// Detect degenerate track numbering in one audio set.
///
/// Degenerate means: duplicate non-zero numbers within one language,
/// all-zero numbers, or any number large enough to be a mis-parsed date.
pub fn has_degenerate_numbering(tracks: &[TrackDescriptor]) -> bool {
    if tracks.is_empty() {
        return false;
    }
    if tracks.iter().all(|t| t.track_number == 0) {
        return true;
    }
    if tracks.iter().any(|t| t.track_number >= DATE_LIKE_NUMBER) {
        return true;
    }

    let mut seen: HashMap<(&str, u32), u32> = HashMap::new();
    for track in tracks {
        if track.track_number == 0 {
            continue;
        }
        // The same number with a distinct letter suffix ("001" vs "001a")
        // is legitimate, so suffixed tracks are keyed separately.
        if track.track_suffix.is_some() {
            continue;
        }
        let count = seen
            .entry((track.primary_language.as_str(), track.track_number))
            .or_insert(0);
        *count += 1;
        if *count > 1 {
            return true;
        }
    }
    false
}

/// Renumber a degenerate set sequentially: originals before translations,
/// relative filename order preserved within each class.
///
/// No-op for well-formed sets; call [`has_degenerate_numbering`] first or
/// use this directly — it re-checks internally.
pub fn renumber_degenerate_tracks(tracks: &mut [TrackDescriptor]) {
    if !has_degenerate_numbering(tracks) {
        return;
    }

    let mut next = 1u32;
    for translation_pass in [false, true] {
        for track in tracks.iter_mut() {
            if track.is_translation == translation_pass {
                track.track_number = next;
                track.track_suffix = None;
                next += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filename::parse_track_filename;
    use std::collections::HashSet;

    fn parse_all(names: &[&str]) -> Vec<TrackDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| parse_track_filename(n, i))
            .collect()
    }

    // -- Grouping ------------------------------------------------------------

    #[test]
    fn unmarked_tracks_collapse_to_default_session() {
        let tracks = parse_all(&["001 Opening.mp3", "002 Questions.mp3"]);
        let sessions = infer_sessions(&tracks);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].number, 1);
        assert!(sessions[0].date.is_none());
        assert_eq!(sessions[0].tracks.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_sessions() {
        assert!(infer_sessions(&[]).is_empty());
    }

    #[test]
    fn morning_and_afternoon_are_distinct_sessions() {
        let tracks = parse_all(&[
            "20230615_AM_Part 2 JKR talk.mp3",
            "20230615_PM questions.mp3",
        ]);
        let sessions = infer_sessions(&tracks);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].period, Some(DayPeriod::Morning));
        assert_eq!(sessions[0].part, Some(2));
        assert_eq!(sessions[1].period, Some(DayPeriod::Afternoon));
    }

    #[test]
    fn session_numbering_follows_chronological_order() {
        // Deliberately out of order in the input.
        let tracks = parse_all(&[
            "20230616_AM talk.mp3",
            "20230615_EVE talk.mp3",
            "20230615_AM talk.mp3",
        ]);
        let sessions = infer_sessions(&tracks);

        assert_eq!(sessions.len(), 3);
        assert_eq!(sessions[0].date, NaiveDate::from_ymd_opt(2023, 6, 15));
        assert_eq!(sessions[0].period, Some(DayPeriod::Morning));
        assert_eq!(sessions[1].period, Some(DayPeriod::Evening));
        assert_eq!(sessions[2].date, NaiveDate::from_ymd_opt(2023, 6, 16));
        assert_eq!(
            sessions.iter().map(|s| s.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn unmarked_tracks_group_separately_from_marked() {
        let tracks = parse_all(&["20230615_AM talk.mp3", "005 stray recording.mp3"]);
        let sessions = infer_sessions(&tracks);

        // The unmarked track lands in its own all-None session, ordered last.
        assert_eq!(sessions.len(), 2);
        assert!(sessions[1].date.is_none());
        assert!(sessions[1].period.is_none());
    }

    #[test]
    fn session_keys_are_unique() {
        let tracks = parse_all(&[
            "20230615_AM talk.mp3",
            "20230615_AM questions.mp3",
            "20230615_PM talk.mp3",
            "20230616_AM talk.mp3",
        ]);
        let sessions = infer_sessions(&tracks);

        let keys: HashSet<_> = sessions
            .iter()
            .map(|s| (s.date, s.period, s.part))
            .collect();
        assert_eq!(keys.len(), sessions.len());
    }

    #[test]
    fn regrouping_is_stable() {
        let tracks = parse_all(&[
            "20230615_AM talk.mp3",
            "20230615_AM questions.mp3",
            "20230615_PM talk.mp3",
        ]);
        let first = infer_sessions(&tracks);
        let second = infer_sessions(&tracks);

        let a: Vec<_> = first
            .iter()
            .map(|s| (s.number, s.tracks.iter().map(|t| &t.original_filename).collect::<Vec<_>>()))
            .collect();
        let b: Vec<_> = second
            .iter()
            .map(|s| (s.number, s.tracks.iter().map(|t| &t.original_filename).collect::<Vec<_>>()))
            .collect();
        assert_eq!(a, b);
    }

    // -- Degenerate renumbering ----------------------------------------------

    fn with_numbers(rows: &[(&str, u32, bool)]) -> Vec<TrackDescriptor> {
        rows.iter()
            .enumerate()
            .map(|(i, (name, number, translation))| {
                let mut d = parse_track_filename(name, i);
                d.track_number = *number;
                d.is_translation = *translation;
                d
            })
            .collect()
    }

    #[test]
    fn well_formed_numbering_untouched() {
        let mut tracks = with_numbers(&[("a.mp3", 1, false), ("b.mp3", 2, false)]);
        assert!(!has_degenerate_numbering(&tracks));

        renumber_degenerate_tracks(&mut tracks);
        assert_eq!(tracks[0].track_number, 1);
        assert_eq!(tracks[1].track_number, 2);
    }

    #[test]
    fn duplicate_numbers_within_language_detected() {
        let tracks = with_numbers(&[("a.mp3", 3, false), ("b.mp3", 3, false)]);
        assert!(has_degenerate_numbering(&tracks));
    }

    #[test]
    fn suffixed_duplicate_is_not_degenerate() {
        // "001 x.mp3" next to "001a x.mp3" is the legacy original/translation
        // pairing convention, not a numbering defect.
        let mut tracks = parse_all(&["001 Opening.mp3", "001a TRAD Abertura.mp3"]);
        assert!(!has_degenerate_numbering(&tracks));
        renumber_degenerate_tracks(&mut tracks);
        assert_eq!(tracks[0].track_number, 1);
        assert_eq!(tracks[1].track_suffix, Some('a'));
    }

    #[test]
    fn all_zero_numbers_detected() {
        let tracks = with_numbers(&[("a.mp3", 0, false), ("b.mp3", 0, false)]);
        assert!(has_degenerate_numbering(&tracks));
    }

    #[test]
    fn date_like_number_detected() {
        let tracks = with_numbers(&[("a.mp3", 20230615, false), ("b.mp3", 2, false)]);
        assert!(has_degenerate_numbering(&tracks));
    }

    #[test]
    fn renumber_puts_originals_before_translations() {
        let mut tracks = with_numbers(&[
            ("trad1.mp3", 0, true),
            ("orig1.mp3", 0, false),
            ("trad2.mp3", 0, true),
            ("orig2.mp3", 0, false),
        ]);
        renumber_degenerate_tracks(&mut tracks);

        // Originals take 1..=2 in filename order, translations 3..=4.
        assert_eq!(tracks[1].track_number, 1); // orig1
        assert_eq!(tracks[3].track_number, 2); // orig2
        assert_eq!(tracks[0].track_number, 3); // trad1
        assert_eq!(tracks[2].track_number, 4); // trad2
    }

    #[test]
    fn renumber_preserves_relative_order_within_class() {
        let mut tracks = with_numbers(&[
            ("z_first.mp3", 7, false),
            ("a_second.mp3", 7, false),
            ("m_third.mp3", 7, false),
        ]);
        renumber_degenerate_tracks(&mut tracks);
        assert_eq!(
            tracks.iter().map(|t| t.track_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}

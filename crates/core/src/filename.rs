//! Legacy track filename parsing.
//!
//! Four decades of inconsistent naming conventions feed this module, so the
//! contract is strict: parsing is pure and total. Every filename yields a
//! [`TrackDescriptor`] — unparseable input degrades to conservative defaults
//! (sequential track number, language "unspecified", no speaker) instead of
//! failing.
//!
//! Recognized tokens:
//!
//! - A closed set of speaker codes (`JKR`, `LMA`, ...).
//! - Translation markers: the explicit `TRAD` token, bracketed language
//!   codes (`[EN]`, `[ES PT]`), or a code-combination marker (`EN-PT`).
//!   Only an explicit marker overrides language/translation fields; absent
//!   markers never overwrite previously known language data.
//! - Dates in `YYYYMMDD` and `DD.MM.YYYY` / `DD-MM-YYYY` notation.
//! - Day-part markers (`AM`/`PM`/`EVE` plus word forms in English and
//!   Portuguese) with an optional `Part N` suffix.
//!
//! All recognized tokens are stripped to produce a clean display title.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Closed set of speaker code tokens found in the legacy corpus.
pub const SPEAKER_CODES: &[&str] = &["JKR", "LMA", "TNV", "CSD", "RPB", "AMG", "HDS"];

/// Language codes recognized in bracketed and combined markers.
pub const LANGUAGE_CODES: &[&str] = &["EN", "PT", "ES", "FR", "DE", "IT"];

/// Explicit translation token.
pub const TRANSLATION_TOKEN: &str = "TRAD";

/// Default language when no explicit marker is present.
pub const LANGUAGE_UNSPECIFIED: &str = "unspecified";

/// Plausible recording-year window; digit runs outside it are not dates.
const MIN_RECORDING_YEAR: i32 = 1950;
const MAX_RECORDING_YEAR: i32 = 2100;

// ---------------------------------------------------------------------------
// Regexes
//
// `\b` treats `_` as a word character, and legacy names separate tokens
// with underscores, so boundaries are spelled out as character classes.
// ---------------------------------------------------------------------------

static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("valid regex"));

static COMPACT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([0-9]{8})(?:[^0-9]|$)").expect("valid regex"));

static DOTTED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{1,2})[.\-]([0-9]{1,2})[.\-]([0-9]{4})(?:[^0-9]|$)")
        .expect("valid regex")
});

static PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])part(?:e)?[ _]*([0-9]{1,2})(?:[^0-9]|$)").expect("valid regex")
});

static PERIOD_ABBREV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^A-Za-z])(AM|PM|EVE)(?:[^A-Za-z]|$)").expect("valid regex"));

static PERIOD_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-zà-ÿ])(morning|afternoon|evening|manhã|manha|tarde|noite)(?:[^a-zà-ÿ]|$)")
        .expect("valid regex")
});

static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ _\-]*([0-9]{1,4})([a-zA-Z])?(?:[^0-9A-Za-z]|$)").expect("valid regex"));

static COMBINED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z])([A-Z]{2})-([A-Z]{2})(?:[^A-Za-z]|$)").expect("valid regex")
});

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ _\-\.]+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Day period
// ---------------------------------------------------------------------------

/// Time-of-day period of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }

    /// Chronological rank used for session ordering (morning < afternoon <
    /// evening; callers rank `None` after all of these).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Morning => 0,
            Self::Afternoon => 1,
            Self::Evening => 2,
        }
    }

    /// Parse a recognized period token (abbreviated or word form).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "am" | "morning" | "manha" | "manhã" => Some(Self::Morning),
            "pm" | "afternoon" | "tarde" => Some(Self::Afternoon),
            "eve" | "evening" | "noite" => Some(Self::Evening),
            _ => None,
        }
    }
}

impl std::fmt::Display for DayPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Track descriptor
// ---------------------------------------------------------------------------

/// Structured metadata inferred from one legacy track filename.
///
/// Derived, never persisted on its own. `track_number` falls back to the
/// caller-supplied position when the filename carries no usable number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// The filename exactly as received (with extension).
    pub original_filename: String,
    /// Inferred track number; sequential fallback when absent.
    pub track_number: u32,
    /// Letter suffix on the track number (`001a` → `a`), if any.
    pub track_suffix: Option<char>,
    /// Speaker code, when a known token was found.
    pub speaker_code: Option<String>,
    /// All language codes carried by explicit markers (lowercase).
    pub languages: Vec<String>,
    /// Primary/original language; `"unspecified"` unless explicitly marked.
    pub primary_language: String,
    /// Whether the filename marks this track as a translation.
    pub is_translation: bool,
    /// True only when an explicit language marker was present. Absence of a
    /// marker must never overwrite previously known language data, so this
    /// flag gates [`TrackDescriptor::apply_known_language`].
    pub explicit_language_marker: bool,
    /// Calendar date, when a recognized notation was found.
    pub date: Option<NaiveDate>,
    /// Time-of-day period, when marked.
    pub period: Option<DayPeriod>,
    /// "Part N" sequence number within a day period, when marked.
    pub part: Option<u32>,
    /// Display title with all recognized tokens stripped.
    pub title: String,
}

impl TrackDescriptor {
    /// Back-fill a previously known language onto a descriptor that carries
    /// no explicit marker. Explicitly marked descriptors are left alone:
    /// default inference is additive, not destructive.
    pub fn apply_known_language(&mut self, language: &str) {
        if self.explicit_language_marker {
            return;
        }
        let language = language.trim().to_lowercase();
        if language.is_empty() {
            return;
        }
        self.primary_language = language.clone();
        if !self.languages.contains(&language) {
            self.languages.push(language);
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one track filename into a [`TrackDescriptor`].
///
/// `position` is the zero-based index of the file within its set and feeds
/// the sequential track-number fallback (`position + 1`).
///
/// Never fails: every input, including empty and non-ASCII strings, yields
/// a descriptor.
pub fn parse_track_filename(filename: &str, position: usize) -> TrackDescriptor {
    let stem = strip_extension(filename);
    let mut remainder = stem.to_string();

    // Bracketed language markers, e.g. "[EN]" or "[ES PT]".
    let mut languages: Vec<String> = Vec::new();
    let mut explicit_marker = false;
    let mut is_translation = false;
    for caps in BRACKET_RE.captures_iter(stem) {
        let codes: Vec<String> = caps[1]
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_uppercase())
            .collect();
        if !codes.is_empty() && codes.iter().all(|c| LANGUAGE_CODES.contains(&c.as_str())) {
            for code in codes {
                let code = code.to_lowercase();
                if !languages.contains(&code) {
                    languages.push(code);
                }
            }
            explicit_marker = true;
            is_translation = true;
        }
    }
    remainder = BRACKET_RE.replace_all(&remainder, " ").into_owned();

    // Code-combination marker, e.g. "EN-PT" (original-target pair).
    let combined = COMBINED_CODE_RE.captures(&remainder).and_then(|caps| {
        let a = caps[1].to_string();
        let b = caps[2].to_string();
        (LANGUAGE_CODES.contains(&a.as_str()) && LANGUAGE_CODES.contains(&b.as_str()))
            .then_some((a, b))
    });
    if let Some((a, b)) = combined {
        for code in [a.to_lowercase(), b.to_lowercase()] {
            if !languages.contains(&code) {
                languages.push(code);
            }
        }
        explicit_marker = true;
        is_translation = true;
        remainder = COMBINED_CODE_RE.replace(&remainder, " ").into_owned();
    }

    // Explicit translation token.
    if token_present(&remainder, TRANSLATION_TOKEN) {
        is_translation = true;
        remainder = remove_token(&remainder, TRANSLATION_TOKEN);
    }

    // Dates: compact YYYYMMDD first, then dotted/dashed DD.MM.YYYY.
    let mut date: Option<NaiveDate> = None;
    let mut date_at_start = false;
    let compact = COMPACT_DATE_RE.captures(&remainder).and_then(|caps| {
        let m = caps.get(1)?;
        let parsed = parse_compact_date(m.as_str())?;
        Some((parsed, m.start(), m.end()))
    });
    if let Some((parsed, start, end)) = compact {
        date = Some(parsed);
        date_at_start = start == 0;
        remainder.replace_range(start..end, " ");
    }
    if date.is_none() {
        let dotted = DOTTED_DATE_RE.captures(&remainder).and_then(|caps| {
            let parsed = parse_dotted_date(&caps[1], &caps[2], &caps[3])?;
            let start = caps.get(1)?.start();
            let end = caps.get(3)?.end();
            Some((parsed, start, end))
        });
        if let Some((parsed, start, end)) = dotted {
            date = Some(parsed);
            date_at_start = start == 0;
            remainder.replace_range(start..end, " ");
        }
    }

    // "Part N" before period tokens so "Part" never leaks into the title.
    let mut part: Option<u32> = None;
    let part_found: Option<u32> = PART_RE
        .captures(&remainder)
        .and_then(|caps| caps[1].parse().ok());
    if let Some(n) = part_found {
        part = Some(n);
        remainder = PART_RE.replace(&remainder, " ").into_owned();
    }

    // Day-part markers: uppercase abbreviations, then word forms.
    let mut period: Option<DayPeriod> = None;
    let abbrev = PERIOD_ABBREV_RE
        .captures(&remainder)
        .and_then(|caps| DayPeriod::from_token(&caps[1]));
    if let Some(p) = abbrev {
        period = Some(p);
        remainder = PERIOD_ABBREV_RE.replace(&remainder, " ").into_owned();
    }
    if period.is_none() {
        let word = PERIOD_WORD_RE
            .captures(&remainder)
            .and_then(|caps| DayPeriod::from_token(&caps[1]));
        if let Some(p) = word {
            period = Some(p);
            remainder = PERIOD_WORD_RE.replace(&remainder, " ").into_owned();
        }
    }

    // Speaker code: any whole token from the closed set.
    let mut speaker_code: Option<String> = None;
    for code in SPEAKER_CODES {
        if token_present(&remainder, code) {
            speaker_code = Some((*code).to_string());
            remainder = remove_token(&remainder, code);
            break;
        }
    }

    // Leading track number, unless the leading digits were a date.
    let mut track_number: Option<u32> = None;
    let mut track_suffix: Option<char> = None;
    if !date_at_start {
        let leading = LEADING_NUMBER_RE.captures(&remainder).and_then(|caps| {
            let number: u32 = caps[1].parse().ok()?;
            let suffix = caps
                .get(2)
                .and_then(|m| m.as_str().chars().next())
                .map(|c| c.to_ascii_lowercase());
            let end = caps
                .get(2)
                .map(|m| m.end())
                .unwrap_or_else(|| caps.get(1).map(|m| m.end()).unwrap_or(0));
            Some((number, suffix, end))
        });
        if let Some((number, suffix, end)) = leading {
            track_number = Some(number);
            track_suffix = suffix;
            remainder.replace_range(0..end, " ");
        }
    }

    let title = clean_title(&remainder);

    let primary_language = if explicit_marker {
        languages
            .first()
            .cloned()
            .unwrap_or_else(|| LANGUAGE_UNSPECIFIED.to_string())
    } else {
        LANGUAGE_UNSPECIFIED.to_string()
    };

    TrackDescriptor {
        original_filename: filename.to_string(),
        track_number: track_number.unwrap_or(position as u32 + 1),
        track_suffix,
        speaker_code,
        languages,
        primary_language,
        is_translation,
        explicit_language_marker: explicit_marker,
        date,
        period,
        part,
        title,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip a trailing file extension (1-5 alphanumeric chars after the last
/// dot). Names without a recognizable extension pass through unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => name,
    }
}

fn parse_compact_date(digits: &str) -> Option<NaiveDate> {
    if digits.len() != 8 {
        return None;
    }
    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;
    if !(MIN_RECORDING_YEAR..=MAX_RECORDING_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_dotted_date(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    if !(MIN_RECORDING_YEAR..=MAX_RECORDING_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whole-token presence check (tokens split on non-alphanumerics).
fn token_present(haystack: &str, token: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|t| t == token)
}

/// Remove whole-token occurrences of `token`, preserving all other
/// separators (later passes still need dots and dashes for date parsing).
fn remove_token(haystack: &str, token: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(pos) = rest.find(token) {
        let before_ok = rest[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after = &rest[pos + token.len()..];
        let after_ok = after.chars().next().map_or(true, |c| !c.is_alphanumeric());
        out.push_str(&rest[..pos]);
        if !(before_ok && after_ok) {
            out.push_str(token);
        } else {
            out.push(' ');
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Collapse separator runs and trim stray punctuation from a stripped title.
fn clean_title(raw: &str) -> String {
    let collapsed = SEPARATOR_RE.replace_all(raw, " ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '.')
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Totality ------------------------------------------------------------

    #[test]
    fn empty_filename_yields_descriptor() {
        let d = parse_track_filename("", 0);
        assert_eq!(d.track_number, 1);
        assert_eq!(d.primary_language, LANGUAGE_UNSPECIFIED);
        assert!(d.speaker_code.is_none());
        assert_eq!(d.title, "");
    }

    #[test]
    fn pure_numeric_filename_yields_descriptor() {
        let d = parse_track_filename("12345.mp3", 4);
        // Four digits max for a track number; "12345" is neither a valid
        // number nor a date, so the positional fallback applies.
        assert_eq!(d.track_number, 5);
    }

    #[test]
    fn non_ascii_filename_yields_descriptor() {
        let d = parse_track_filename("003 Meditação da manhã.mp3", 2);
        assert_eq!(d.track_number, 3);
        assert_eq!(d.period, Some(DayPeriod::Morning));
        assert_eq!(d.title, "Meditação da");
    }

    #[test]
    fn extension_only_filename_yields_descriptor() {
        let d = parse_track_filename(".mp3", 9);
        assert_eq!(d.track_number, 10);
    }

    // -- Track numbers -------------------------------------------------------

    #[test]
    fn leading_track_number_parsed() {
        let d = parse_track_filename("001 JKR - Opening.mp3", 7);
        assert_eq!(d.track_number, 1);
        assert!(d.track_suffix.is_none());
    }

    #[test]
    fn track_number_suffix_parsed() {
        let d = parse_track_filename("001a TRAD - Abertura.mp3", 0);
        assert_eq!(d.track_number, 1);
        assert_eq!(d.track_suffix, Some('a'));
        assert!(d.is_translation);
    }

    #[test]
    fn missing_track_number_falls_back_to_position() {
        let d = parse_track_filename("Opening talk.mp3", 2);
        assert_eq!(d.track_number, 3);
    }

    #[test]
    fn date_at_start_is_not_a_track_number() {
        let d = parse_track_filename("20230615_AM_Part 2 JKR talk.mp3", 0);
        assert_eq!(d.track_number, 1); // position fallback
        assert_eq!(d.date, NaiveDate::from_ymd_opt(2023, 6, 15));
    }

    // -- Speaker codes -------------------------------------------------------

    #[test]
    fn known_speaker_code_recognized() {
        let d = parse_track_filename("001 JKR - Opening.mp3", 0);
        assert_eq!(d.speaker_code.as_deref(), Some("JKR"));
    }

    #[test]
    fn unknown_code_not_treated_as_speaker() {
        let d = parse_track_filename("001 XYZ - Opening.mp3", 0);
        assert!(d.speaker_code.is_none());
    }

    #[test]
    fn lowercase_code_not_treated_as_speaker() {
        // Speaker codes are uppercase tokens; "jkr" could be a word.
        let d = parse_track_filename("001 jkr talk.mp3", 0);
        assert!(d.speaker_code.is_none());
    }

    // -- Languages and translation markers -----------------------------------

    #[test]
    fn bracketed_language_marks_translation() {
        let d = parse_track_filename("002 [EN] Questions.mp3", 0);
        assert!(d.is_translation);
        assert!(d.explicit_language_marker);
        assert_eq!(d.languages, vec!["en"]);
        assert_eq!(d.primary_language, "en");
    }

    #[test]
    fn bracketed_multiple_languages() {
        let d = parse_track_filename("002 [ES PT] Questions.mp3", 0);
        assert_eq!(d.languages, vec!["es", "pt"]);
        assert_eq!(d.primary_language, "es");
    }

    #[test]
    fn combined_code_marker_marks_translation() {
        let d = parse_track_filename("004 EN-PT closing.mp3", 0);
        assert!(d.is_translation);
        assert_eq!(d.languages, vec!["en", "pt"]);
        assert_eq!(d.primary_language, "en");
    }

    #[test]
    fn trad_token_marks_translation_without_language() {
        let d = parse_track_filename("001a TRAD - Abertura.mp3", 0);
        assert!(d.is_translation);
        assert!(!d.explicit_language_marker);
        assert_eq!(d.primary_language, LANGUAGE_UNSPECIFIED);
    }

    #[test]
    fn non_language_bracket_ignored() {
        let d = parse_track_filename("001 [draft] Opening.mp3", 0);
        assert!(!d.is_translation);
        assert!(d.languages.is_empty());
    }

    #[test]
    fn apply_known_language_fills_unmarked() {
        let mut d = parse_track_filename("003 Talk.mp3", 0);
        d.apply_known_language("pt");
        assert_eq!(d.primary_language, "pt");
        assert_eq!(d.languages, vec!["pt"]);
    }

    #[test]
    fn apply_known_language_never_overrides_explicit_marker() {
        let mut d = parse_track_filename("003 [EN] Talk.mp3", 0);
        d.apply_known_language("pt");
        assert_eq!(d.primary_language, "en");
    }

    #[test]
    fn reparse_preserves_known_language() {
        // Non-destructive defaulting: re-parsing a file with no marker and
        // re-applying the stored language must land on the same language.
        let mut first = parse_track_filename("003 Talk.mp3", 0);
        first.apply_known_language("pt");

        let mut second = parse_track_filename("003 Talk.mp3", 0);
        second.apply_known_language(&first.primary_language);
        assert_eq!(second.primary_language, "pt");
    }

    // -- Dates and day parts -------------------------------------------------

    #[test]
    fn compact_date_parsed() {
        let d = parse_track_filename("20230615 talk.mp3", 0);
        assert_eq!(d.date, NaiveDate::from_ymd_opt(2023, 6, 15));
    }

    #[test]
    fn dotted_date_parsed() {
        let d = parse_track_filename("Retreat 15.06.2023 talk.mp3", 0);
        assert_eq!(d.date, NaiveDate::from_ymd_opt(2023, 6, 15));
    }

    #[test]
    fn dashed_date_parsed() {
        let d = parse_track_filename("Retreat 15-06-2023 talk.mp3", 0);
        assert_eq!(d.date, NaiveDate::from_ymd_opt(2023, 6, 15));
    }

    #[test]
    fn invalid_compact_date_ignored() {
        let d = parse_track_filename("20231345 talk.mp3", 0);
        assert!(d.date.is_none());
    }

    #[test]
    fn implausible_year_ignored() {
        let d = parse_track_filename("12340101 talk.mp3", 0);
        assert!(d.date.is_none());
    }

    #[test]
    fn am_marker_parsed() {
        let d = parse_track_filename("20230615_AM_Part 2 JKR talk.mp3", 0);
        assert_eq!(d.period, Some(DayPeriod::Morning));
        assert_eq!(d.part, Some(2));
    }

    #[test]
    fn pm_marker_parsed() {
        let d = parse_track_filename("20230615_PM talk.mp3", 0);
        assert_eq!(d.period, Some(DayPeriod::Afternoon));
    }

    #[test]
    fn eve_marker_parsed() {
        let d = parse_track_filename("20230615_EVE talk.mp3", 0);
        assert_eq!(d.period, Some(DayPeriod::Evening));
    }

    #[test]
    fn portuguese_period_word_parsed() {
        let d = parse_track_filename("01 tarde perguntas.mp3", 0);
        assert_eq!(d.period, Some(DayPeriod::Afternoon));
    }

    #[test]
    fn parte_suffix_parsed() {
        let d = parse_track_filename("01 manha parte 3.mp3", 0);
        assert_eq!(d.period, Some(DayPeriod::Morning));
        assert_eq!(d.part, Some(3));
    }

    // -- Title stripping -----------------------------------------------------

    #[test]
    fn recognized_tokens_stripped_from_title() {
        let d = parse_track_filename("001 JKR - Opening.mp3", 0);
        assert_eq!(d.title, "Opening");
    }

    #[test]
    fn date_and_period_stripped_from_title() {
        let d = parse_track_filename("20230615_AM_Part 2 JKR talk.mp3", 0);
        assert_eq!(d.title, "talk");
    }

    #[test]
    fn bracket_stripped_from_title() {
        let d = parse_track_filename("002 [EN] Questions and answers.mp3", 0);
        assert_eq!(d.title, "Questions and answers");
    }

    // -- Period ordering -----------------------------------------------------

    #[test]
    fn period_rank_ordering() {
        assert!(DayPeriod::Morning.rank() < DayPeriod::Afternoon.rank());
        assert!(DayPeriod::Afternoon.rank() < DayPeriod::Evening.rank());
    }

    #[test]
    fn period_token_round_trip() {
        for p in [DayPeriod::Morning, DayPeriod::Afternoon, DayPeriod::Evening] {
            assert_eq!(DayPeriod::from_token(p.as_str()), Some(p));
        }
    }

    // -- Extension stripping -------------------------------------------------

    #[test]
    fn strip_extension_basic() {
        assert_eq!(strip_extension("talk.mp3"), "talk");
        assert_eq!(strip_extension("talk"), "talk");
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
    }

    #[test]
    fn strip_extension_ignores_long_suffix() {
        assert_eq!(strip_extension("a.verylongext"), "a.verylongext");
    }
}

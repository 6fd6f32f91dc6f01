//! Legacy manifest ingestion.
//!
//! The source of a migration is a delimited tabular export with one row per
//! legacy event. The export is messy: it may carry a UTF-8 byte-order mark,
//! rows with fewer (or more) cells than the header, and newline-delimited
//! filename lists inside quoted cells. Rows are validated into a strongly
//! typed [`EventRow`] at ingestion; rows failing required-field checks are
//! quarantined with a reason and never reach the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// UTF-8 byte-order mark, tolerated at the start of the export.
const BOM: char = '\u{feff}';

/// Delimiters tried during detection, in preference order.
const CANDIDATE_DELIMITERS: &[char] = &[',', ';', '\t'];

// ---------------------------------------------------------------------------
// Typed rows
// ---------------------------------------------------------------------------

/// One validated manifest row describing a legacy event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    /// Stable event code; the only hard-required field.
    pub event_code: String,
    pub title: Option<String>,
    pub teacher: Option<String>,
    pub place: Option<String>,
    pub category: Option<String>,
    pub audience: Option<String>,
    /// First (nominally main) audio set, newline-delimited in the cell.
    pub audio_set_a: Vec<String>,
    /// Second (parallel) audio set, when present.
    pub audio_set_b: Vec<String>,
    pub expected_tracks_a: Option<u32>,
    pub expected_tracks_b: Option<u32>,
    pub transcripts: Vec<String>,
    pub documents: Vec<String>,
}

/// A row rejected at ingestion, kept for the analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantinedRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub reason: String,
    pub raw: Vec<String>,
}

/// Outcome of parsing one manifest export.
#[derive(Debug, Clone)]
pub struct ManifestParse {
    pub rows: Vec<EventRow>,
    pub quarantined: Vec<QuarantinedRow>,
    pub delimiter: char,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ColumnMap {
    event_code: Option<usize>,
    title: Option<usize>,
    teacher: Option<usize>,
    place: Option<usize>,
    category: Option<usize>,
    audience: Option<usize>,
    audio_set_a: Option<usize>,
    audio_set_b: Option<usize>,
    expected_tracks_a: Option<usize>,
    expected_tracks_b: Option<usize>,
    transcripts: Option<usize>,
    documents: Option<usize>,
}

fn normalize_header(cell: &str) -> String {
    cell.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Self {
        let mut map = Self::default();
        for (idx, cell) in header.iter().enumerate() {
            let name = normalize_header(cell);
            let slot = match name.as_str() {
                "event_code" | "code" | "event" => &mut map.event_code,
                "title" | "event_title" | "name" => &mut map.title,
                "teacher" | "speaker" => &mut map.teacher,
                "place" | "location" => &mut map.place,
                "category" => &mut map.category,
                "audience" => &mut map.audience,
                "audio_files" | "audio_set_a" | "audio_1" | "audio" => &mut map.audio_set_a,
                "audio_files_2" | "audio_set_b" | "audio_2" | "second_audio" => &mut map.audio_set_b,
                "expected_tracks" | "track_count" | "tracks" => &mut map.expected_tracks_a,
                "expected_tracks_2" | "track_count_2" | "tracks_2" => &mut map.expected_tracks_b,
                "transcripts" | "transcript" => &mut map.transcripts,
                "documents" | "docs" => &mut map.documents,
                _ => continue,
            };
            slot.get_or_insert(idx);
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a manifest export into typed rows plus quarantined rejects.
///
/// Fails only on configuration-level problems: empty input or a header
/// with no recognizable event-code column. Row-level problems quarantine
/// the row and continue.
pub fn parse_manifest(text: &str) -> Result<ManifestParse, CoreError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Err(CoreError::Validation("Manifest is empty".into()));
    }

    let delimiter = detect_delimiter(text);
    let records = read_records(text, delimiter);
    let mut records = records.into_iter();

    let header = records
        .next()
        .ok_or_else(|| CoreError::Validation("Manifest has no header row".into()))?;
    let columns = ColumnMap::from_header(&header);
    let code_idx = columns.event_code.ok_or_else(|| {
        CoreError::Validation("Manifest header has no event code column".into())
    })?;

    let mut rows = Vec::new();
    let mut quarantined = Vec::new();

    for (i, record) in records.enumerate() {
        let row_number = i + 1;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let event_code = cell(&record, Some(code_idx)).trim().to_string();
        if event_code.is_empty() {
            quarantined.push(QuarantinedRow {
                row: row_number,
                reason: "Missing event code".into(),
                raw: record,
            });
            continue;
        }

        let audio_set_a = split_file_list(cell(&record, columns.audio_set_a));
        let audio_set_b = split_file_list(cell(&record, columns.audio_set_b));
        if audio_set_a.is_empty() && audio_set_b.is_empty() {
            quarantined.push(QuarantinedRow {
                row: row_number,
                reason: format!("Event {event_code} has no audio filenames"),
                raw: record,
            });
            continue;
        }

        rows.push(EventRow {
            event_code,
            title: opt_text(cell(&record, columns.title)),
            teacher: opt_text(cell(&record, columns.teacher)),
            place: opt_text(cell(&record, columns.place)),
            category: opt_text(cell(&record, columns.category)),
            audience: opt_text(cell(&record, columns.audience)),
            audio_set_a,
            audio_set_b,
            expected_tracks_a: parse_count(cell(&record, columns.expected_tracks_a)),
            expected_tracks_b: parse_count(cell(&record, columns.expected_tracks_b)),
            transcripts: split_file_list(cell(&record, columns.transcripts)),
            documents: split_file_list(cell(&record, columns.documents)),
        });
    }

    Ok(ManifestParse {
        rows,
        quarantined,
        delimiter,
    })
}

/// Ragged rows: missing trailing cells read as empty.
fn cell<'a>(record: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| record.get(i)).map(|s| s.as_str()).unwrap_or("")
}

fn opt_text(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_count(cell: &str) -> Option<u32> {
    cell.trim().parse().ok()
}

/// Split a newline-delimited filename list cell.
fn split_file_list(cell: &str) -> Vec<String> {
    cell.split(['\n', '\r'])
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}

/// Pick the delimiter producing the most columns in the first record
/// (counting only separators outside quotes).
fn detect_delimiter(text: &str) -> char {
    let first_line = text.lines().next().unwrap_or("");
    let mut best = (',', 0usize);
    for &candidate in CANDIDATE_DELIMITERS {
        let mut in_quotes = false;
        let count = first_line
            .chars()
            .filter(|&c| {
                if c == '"' {
                    in_quotes = !in_quotes;
                }
                c == candidate && !in_quotes
            })
            .count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

/// RFC-4180-style record reader: quoted cells may contain delimiters,
/// doubled quotes, and embedded newlines (how filename lists are stored).
fn read_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        cell.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut cell));
                records.push(std::mem::take(&mut record));
            }
            '\n' => {
                record.push(std::mem::take(&mut cell));
                records.push(std::mem::take(&mut record));
            }
            c if c == delimiter => record.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    if !cell.is_empty() || !record.is_empty() {
        record.push(cell);
        records.push(record);
    }

    records
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "event_code,title,teacher,audio_files,audio_files_2,expected_tracks,transcripts";

    #[test]
    fn basic_row_parsed() {
        let text = format!(
            "{HEADER}\nEVT-001,Spring Retreat,JKR,\"001 talk.mp3\n002 talk.mp3\",,2,notes.pdf\n"
        );
        let parsed = parse_manifest(&text).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        let row = &parsed.rows[0];
        assert_eq!(row.event_code, "EVT-001");
        assert_eq!(row.title.as_deref(), Some("Spring Retreat"));
        assert_eq!(row.audio_set_a, vec!["001 talk.mp3", "002 talk.mp3"]);
        assert!(row.audio_set_b.is_empty());
        assert_eq!(row.expected_tracks_a, Some(2));
        assert_eq!(row.transcripts, vec!["notes.pdf"]);
    }

    #[test]
    fn bom_prefix_tolerated() {
        let text = format!("\u{feff}{HEADER}\nEVT-001,,,a.mp3,,,\n");
        let parsed = parse_manifest(&text).unwrap();
        assert_eq!(parsed.rows[0].event_code, "EVT-001");
    }

    #[test]
    fn ragged_row_tolerated() {
        // Row stops after the audio column; remaining cells read as empty.
        let text = format!("{HEADER}\nEVT-002,Title,JKR,a.mp3\n");
        let parsed = parse_manifest(&text).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.rows[0].transcripts.is_empty());
        assert!(parsed.rows[0].expected_tracks_a.is_none());
    }

    #[test]
    fn quoted_cell_with_embedded_newlines() {
        let text = format!(
            "{HEADER}\nEVT-003,,,\"001 a.mp3\n002 b.mp3\n003 c.mp3\",\"001a trad.mp3\",3,\n"
        );
        let parsed = parse_manifest(&text).unwrap();

        let row = &parsed.rows[0];
        assert_eq!(row.audio_set_a.len(), 3);
        assert_eq!(row.audio_set_b, vec!["001a trad.mp3"]);
    }

    #[test]
    fn doubled_quotes_unescaped() {
        let text = format!("{HEADER}\nEVT-004,\"The \"\"Great\"\" Retreat\",,a.mp3,,,\n");
        let parsed = parse_manifest(&text).unwrap();
        assert_eq!(parsed.rows[0].title.as_deref(), Some("The \"Great\" Retreat"));
    }

    #[test]
    fn missing_event_code_quarantined() {
        let text = format!("{HEADER}\n,Untitled,,a.mp3,,,\nEVT-005,,,b.mp3,,,\n");
        let parsed = parse_manifest(&text).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.quarantined.len(), 1);
        assert!(parsed.quarantined[0].reason.contains("event code"));
    }

    #[test]
    fn row_without_audio_quarantined() {
        let text = format!("{HEADER}\nEVT-006,Title,,,,,\n");
        let parsed = parse_manifest(&text).unwrap();

        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.quarantined.len(), 1);
        assert!(parsed.quarantined[0].reason.contains("no audio"));
    }

    #[test]
    fn blank_rows_skipped() {
        let text = format!("{HEADER}\n\nEVT-007,,,a.mp3,,,\n\n");
        let parsed = parse_manifest(&text).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.quarantined.is_empty());
    }

    #[test]
    fn semicolon_delimiter_detected() {
        let text = "event_code;audio_files\nEVT-008;a.mp3\n";
        let parsed = parse_manifest(text).unwrap();
        assert_eq!(parsed.delimiter, ';');
        assert_eq!(parsed.rows[0].audio_set_a, vec!["a.mp3"]);
    }

    #[test]
    fn empty_manifest_rejected() {
        assert!(parse_manifest("").is_err());
        assert!(parse_manifest("   \n  ").is_err());
    }

    #[test]
    fn header_without_event_code_rejected() {
        assert!(parse_manifest("foo,bar\n1,2\n").is_err());
    }

    #[test]
    fn crlf_line_endings_tolerated() {
        let text = format!("{HEADER}\r\nEVT-009,,,a.mp3,,,\r\n");
        let parsed = parse_manifest(&text).unwrap();
        assert_eq!(parsed.rows[0].event_code, "EVT-009");
    }

    #[test]
    fn header_aliases_recognized() {
        let text = "code,speaker,audio\nEVT-010,JKR,a.mp3\n";
        let parsed = parse_manifest(text).unwrap();
        assert_eq!(parsed.rows[0].teacher.as_deref(), Some("JKR"));
    }
}

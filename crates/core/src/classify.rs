//! File classification tables and pure classification logic.
//!
//! The analyzer discovers every object under an event's storage prefix and
//! runs each key through [`classify_object`]: extension-based type lookup,
//! category derivation from positional path hints, system-file detection,
//! and case-insensitive matching against the expected track manifest.
//!
//! Archives are never extracted at analysis time; they are flagged
//! `needs_extraction` and deferred to the execution engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Extension tables
// ---------------------------------------------------------------------------

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "aac", "ogg", "wma", "aiff"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "wmv", "mpg", "mpeg", "m4v"];
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf", "odt"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "tiff", "bmp", "webp"];
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz"];

// ---------------------------------------------------------------------------
// Path hint markers
// ---------------------------------------------------------------------------

/// Subpath segments marking the parallel second audio set (translations).
pub const SECOND_SET_MARKERS: &[&str] = &["set2", "audio2", "second_set", "set_2"];

/// Subpath segments marking legacy material.
pub const LEGACY_MARKERS: &[&str] = &["legacy", "old", "antigo", "antiga"];

/// Path or filename fragments marking transcripts.
pub const TRANSCRIPT_MARKERS: &[&str] = &["transcript", "transcricao", "transcrição", "transcription"];

/// System/hidden files that are always suggested "ignore".
pub const SYSTEM_FILE_NAMES: &[&str] = &[".ds_store", "thumbs.db", "desktop.ini"];

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Coarse file type derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Audio,
    Video,
    Document,
    Image,
    Archive,
    Other,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
            Self::Image => "image",
            Self::Archive => "archive",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            "image" => Some(Self::Image),
            "archive" => Some(Self::Archive),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog category of a discovered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    AudioMain,
    AudioTranslation,
    AudioLegacy,
    Video,
    Transcript,
    Document,
    Image,
    Archive,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AudioMain => "audio_main",
            Self::AudioTranslation => "audio_translation",
            Self::AudioLegacy => "audio_legacy",
            Self::Video => "video",
            Self::Transcript => "transcript",
            Self::Document => "document",
            Self::Image => "image",
            Self::Archive => "archive",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "audio_main" => Some(Self::AudioMain),
            "audio_translation" => Some(Self::AudioTranslation),
            "audio_legacy" => Some(Self::AudioLegacy),
            "video" => Some(Self::Video),
            "transcript" => Some(Self::Transcript),
            "document" => Some(Self::Document),
            "image" => Some(Self::Image),
            "archive" => Some(Self::Archive),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &[
        "audio_main",
        "audio_translation",
        "audio_legacy",
        "video",
        "transcript",
        "document",
        "image",
        "archive",
        "other",
    ];
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested action for a catalog entry, later confirmed or revised by a
/// reviewer through the decision ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Include,
    Ignore,
    Review,
}

impl SuggestedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Ignore => "ignore",
            Self::Review => "review",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "include" => Some(Self::Include),
            "ignore" => Some(Self::Ignore),
            "review" => Some(Self::Review),
            _ => None,
        }
    }
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Expected manifest
// ---------------------------------------------------------------------------

/// Case-insensitive filename index built from the source manifest rows.
#[derive(Debug, Clone, Default)]
pub struct ExpectedManifest {
    names: HashSet<String>,
}

impl ExpectedManifest {
    pub fn from_names<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Self {
        Self {
            names: names
                .into_iter()
                .map(|n| n.trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.names.contains(&filename.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Result of classifying one discovered object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedObject {
    pub filename: String,
    pub directory: String,
    pub extension: String,
    pub file_type: FileType,
    pub category: FileCategory,
    pub suggested_action: SuggestedAction,
    pub needs_extraction: bool,
    pub matched_manifest: bool,
}

/// Lowercase extension of a filename, empty when absent.
pub fn file_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Extension-based type lookup.
pub fn file_type_for_extension(ext: &str) -> FileType {
    let ext = ext.to_lowercase();
    let ext = ext.as_str();
    if AUDIO_EXTENSIONS.contains(&ext) {
        FileType::Audio
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        FileType::Video
    } else if DOCUMENT_EXTENSIONS.contains(&ext) {
        FileType::Document
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        FileType::Image
    } else if ARCHIVE_EXTENSIONS.contains(&ext) {
        FileType::Archive
    } else {
        FileType::Other
    }
}

/// System/hidden file check: the known junk names, dotfiles, and editor
/// backup (`~`-prefixed) files.
pub fn is_system_file(filename: &str) -> bool {
    let lower = filename.trim().to_lowercase();
    lower.is_empty()
        || SYSTEM_FILE_NAMES.contains(&lower.as_str())
        || lower.starts_with('.')
        || lower.starts_with('~')
}

fn path_has_marker(segments: &[&str], markers: &[&str]) -> bool {
    segments
        .iter()
        .any(|s| markers.iter().any(|m| s.eq_ignore_ascii_case(m)))
}

fn marker_in_name(name: &str, markers: &[&str]) -> bool {
    let lower = name.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Classify one object key relative to its event prefix.
///
/// `relative_key` is the portion of the storage key below the event prefix
/// (e.g. `"set2/003 talk.mp3"`). `expected` is the manifest filename index
/// for the event.
pub fn classify_object(relative_key: &str, expected: &ExpectedManifest) -> ClassifiedObject {
    let segments: Vec<&str> = relative_key.split('/').filter(|s| !s.is_empty()).collect();
    let filename = segments.last().copied().unwrap_or("").to_string();
    let dir_segments = &segments[..segments.len().saturating_sub(1)];
    let directory = dir_segments.join("/");

    let extension = file_extension(&filename);
    let file_type = file_type_for_extension(&extension);
    let system = is_system_file(&filename);

    let in_second_set = path_has_marker(dir_segments, SECOND_SET_MARKERS);
    let in_legacy = path_has_marker(dir_segments, LEGACY_MARKERS);
    let transcript_hint = marker_in_name(&directory, TRANSCRIPT_MARKERS)
        || marker_in_name(&filename, TRANSCRIPT_MARKERS);

    let category = match file_type {
        FileType::Audio if in_legacy => FileCategory::AudioLegacy,
        FileType::Audio if in_second_set => FileCategory::AudioTranslation,
        FileType::Audio => FileCategory::AudioMain,
        FileType::Video => FileCategory::Video,
        FileType::Document if transcript_hint => FileCategory::Transcript,
        FileType::Document => FileCategory::Document,
        FileType::Image => FileCategory::Image,
        FileType::Archive => FileCategory::Archive,
        FileType::Other if transcript_hint => FileCategory::Transcript,
        FileType::Other => FileCategory::Other,
    };

    let suggested_action = if system {
        SuggestedAction::Ignore
    } else if file_type == FileType::Other {
        SuggestedAction::Review
    } else {
        SuggestedAction::Include
    };

    ClassifiedObject {
        matched_manifest: !system && expected.contains(&filename),
        filename,
        directory,
        extension,
        file_type,
        category,
        suggested_action,
        needs_extraction: file_type == FileType::Archive && !system,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Word list parsing and loading.
//!
//! Raw text becomes a deduplicated word pool: one entry per line (any
//! line-ending convention), blank lines ignored, control characters and
//! emoji rejected, case-insensitive dedup preserving first-seen casing.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Minimum unique entries required of a word list.
pub const MIN_UNIQUE_ENTRIES: usize = 24;

/// Maximum characters quoted back in an `InvalidCharacters` error.
const SAMPLE_LIMIT: usize = 50;

fn line_break_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\r\n|\n|\r").expect("valid line break pattern"))
}

fn control_char_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Control, format, and private-use code points
    PATTERN.get_or_init(|| Regex::new(r"[\p{Cc}\p{Cf}\p{Co}]").expect("valid control pattern"))
}

fn emoji_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\p{Extended_Pictographic}").expect("valid emoji pattern"))
}

/// Metadata describing a loaded word list file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordListMetadata {
    pub filename: String,
    pub size: usize,
    pub hash: String,
    pub unique_count: usize,
}

/// A parsed word list together with its source metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordListFile {
    pub words: Vec<String>,
    pub metadata: WordListMetadata,
}

/// Parse word list text with the default entry minimum.
pub fn parse_word_list_text(content: &str) -> Result<Vec<String>, WordListError> {
    parse_word_list_text_with_min(content, MIN_UNIQUE_ENTRIES)
}

/// Parse word list text, requiring at least `min_entries` unique entries.
pub fn parse_word_list_text_with_min(
    content: &str,
    min_entries: usize,
) -> Result<Vec<String>, WordListError> {
    let mut seen = std::collections::HashSet::new();
    let mut entries = Vec::new();

    for (index, raw_line) in line_break_pattern().split(content).enumerate() {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if contains_disallowed_characters(trimmed) {
            return Err(WordListError::InvalidCharacters {
                line: index + 1,
                sample: trimmed.chars().take(SAMPLE_LIMIT).collect(),
            });
        }

        let key = trimmed.to_lowercase();
        if seen.insert(key) {
            entries.push(trimmed.to_string());
        }
    }

    if entries.len() < min_entries {
        return Err(WordListError::InsufficientEntries {
            unique_count: entries.len(),
            min_entries,
        });
    }

    Ok(entries)
}

/// Load and parse a word list from a file path.
pub fn load_word_list_from_path(path: &Path) -> Result<WordListFile, WordListError> {
    if !path.is_file() {
        return Err(WordListError::InvalidSource {
            path: path.display().to_string(),
        });
    }

    let bytes = std::fs::read(path).map_err(|error| WordListError::ReadFailed {
        message: error.to_string(),
    })?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wordlist.txt".to_string());

    load_word_list_from_bytes(&bytes, &filename)
}

/// Parse a word list from raw bytes already read from some source.
pub fn load_word_list_from_bytes(
    bytes: &[u8],
    filename: &str,
) -> Result<WordListFile, WordListError> {
    let content = std::str::from_utf8(bytes).map_err(|_| WordListError::InvalidEncoding)?;
    let words = parse_word_list_text(content)?;
    let hash = format!("sha256:{:x}", Sha256::digest(bytes));

    let unique_count = words.len();
    Ok(WordListFile {
        words,
        metadata: WordListMetadata {
            filename: filename.to_string(),
            size: bytes.len(),
            hash,
            unique_count,
        },
    })
}

fn contains_disallowed_characters(value: &str) -> bool {
    if control_char_pattern().is_match(value) {
        return true;
    }

    if emoji_pattern().is_match(value) {
        return true;
    }

    // Emoji presentation selectors
    value.contains('\u{FE0F}') || value.contains('\u{FE0E}')
}

/// Word list errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordListError {
    /// The source path does not name a readable file.
    InvalidSource { path: String },
    /// Reading the source failed mid-flight.
    ReadFailed { message: String },
    /// The source bytes are not valid UTF-8.
    InvalidEncoding,
    /// An entry contains control characters or emoji.
    InvalidCharacters { line: usize, sample: String },
    /// Fewer unique entries than the required minimum.
    InsufficientEntries {
        unique_count: usize,
        min_entries: usize,
    },
}

impl WordListError {
    /// Stable error code for user-facing message lookup.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSource { .. } => "INVALID_SOURCE",
            Self::ReadFailed { .. } => "READ_FAILED",
            Self::InvalidEncoding => "INVALID_ENCODING",
            Self::InvalidCharacters { .. } => "INVALID_CHARACTERS",
            Self::InsufficientEntries { .. } => "INSUFFICIENT_ENTRIES",
        }
    }
}

impl fmt::Display for WordListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSource { path } => {
                write!(f, "Word list source is not a readable file: {}", path)
            }
            Self::ReadFailed { message } => {
                write!(f, "Unable to read the selected word list file: {}", message)
            }
            Self::InvalidEncoding => write!(f, "Word lists must be UTF-8 encoded"),
            Self::InvalidCharacters { line, sample } => write!(
                f,
                "Word list entries must not contain emoji or control characters (line {}: {:?})",
                line, sample
            ),
            Self::InsufficientEntries {
                unique_count,
                min_entries,
            } => write!(
                f,
                "Word lists must contain at least {} unique entries (got {})",
                min_entries, unique_count
            ),
        }
    }
}

impl std::error::Error for WordListError {}

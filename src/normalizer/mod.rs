/*!
 * Format detection and text normalization.
 *
 * This module turns raw subtitle or text input into plain text ready for
 * chunking:
 * - Format inference from the file extension, then from the content
 * - Markup stripping per format (cue numbers, timings, style codes)
 * - Full-context mode that keeps the original structure
 * - The length gate that rejects oversized input before any LLM call
 */

pub mod decode;
pub mod formats;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::SummarizeError;

pub use decode::{SourceEncoding, decode_bytes, looks_binary};

// @const: A numbered SRT cue header
static SRT_SNIFF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*\d+\s*\n\s*\d{1,2}:\d{2}:\d{2}[,.]\d{1,3}\s*-->").unwrap()
});

// @const: ASS/SSA section or dialogue markers
static ASS_SNIFF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:\[Events\]|\[Script Info\]|Dialogue:)").unwrap()
});

/// Input formats understood by the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Srt,
    Vtt,
    AssSsa,
    Plain,
}

impl SourceFormat {
    /// File extensions discovered in directory scans
    pub const KNOWN_EXTENSIONS: [&'static str; 5] = ["srt", "vtt", "ass", "ssa", "txt"];

    /// Format implied by a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" | "webvtt" => Some(Self::Vtt),
            "ass" | "ssa" => Some(Self::AssSsa),
            "txt" | "text" | "md" => Some(Self::Plain),
            _ => None,
        }
    }

    /// Format implied by a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Infer the format from the content alone
    pub fn sniff(text: &str) -> Self {
        let head = text.trim_start_matches('\u{FEFF}').trim_start();
        if head.starts_with("WEBVTT") {
            Self::Vtt
        } else if ASS_SNIFF_REGEX.is_match(text) {
            Self::AssSsa
        } else if SRT_SNIFF_REGEX.is_match(text) {
            Self::Srt
        } else {
            Self::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::AssSsa => "ass_ssa",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ass_ssa" | "ass-ssa" => Ok(Self::AssSsa),
            "plain" => Ok(Self::Plain),
            other => Self::from_extension(other).ok_or_else(|| format!("Unknown input format: {}", s)),
        }
    }
}

// @struct: Decoded input file, never mutated after creation
#[derive(Debug, Clone)]
pub struct SourceDocument {
    raw_text: String,
    format: SourceFormat,
    encoding: SourceEncoding,
    path: Option<PathBuf>,
}

impl SourceDocument {
    /// Build a document from text that is already decoded
    pub fn from_text(raw_text: impl Into<String>, declared_format: Option<SourceFormat>) -> Self {
        let raw_text = raw_text.into();
        let format = declared_format.unwrap_or_else(|| SourceFormat::sniff(&raw_text));
        Self {
            raw_text,
            format,
            encoding: SourceEncoding::Utf8,
            path: None,
        }
    }

    /// Decode file bytes; the format is the declared one, then the extension's, then sniffed
    pub fn from_bytes(
        bytes: &[u8],
        path: Option<&Path>,
        declared_format: Option<SourceFormat>,
        force_text: bool,
    ) -> Result<Self, SummarizeError> {
        let (raw_text, encoding) = decode_bytes(bytes, force_text)?;
        let format = declared_format
            .or_else(|| path.and_then(SourceFormat::from_path))
            .unwrap_or_else(|| SourceFormat::sniff(&raw_text));

        debug!("Detected format {} ({}) for {:?}", format, encoding.as_str(), path);

        Ok(Self {
            raw_text,
            format,
            encoding,
            path: path.map(Path::to_path_buf),
        })
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Options of one normalization
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Keep timestamps and structure instead of stripping them
    pub full_context: bool,
    /// Longest accepted result in characters
    pub max_text_length: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            full_context: false,
            max_text_length: 100_000,
        }
    }
}

// @struct: Plain text produced from a source document
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedText {
    pub text: String,
    pub format: SourceFormat,
    pub encoding: SourceEncoding,
    /// Characters in the decoded input
    pub chars_before: usize,
    /// Characters in `text`
    pub chars_after: usize,
}

impl NormalizedText {
    /// Characters removed by stripping
    pub fn removed_chars(&self) -> usize {
        self.chars_before.saturating_sub(self.chars_after)
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Normalize already-decoded text; the format is sniffed when not declared
pub fn normalize(
    raw_text: &str,
    declared_format: Option<SourceFormat>,
    options: &NormalizeOptions,
) -> Result<NormalizedText, SummarizeError> {
    normalize_document(&SourceDocument::from_text(raw_text, declared_format), options)
}

/// Normalize a decoded document and apply the length gate
pub fn normalize_document(
    document: &SourceDocument,
    options: &NormalizeOptions,
) -> Result<NormalizedText, SummarizeError> {
    let decoded = decode::normalize_line_endings(document.raw_text());

    let text = if options.full_context {
        decoded.clone()
    } else {
        let entries = match document.format() {
            SourceFormat::Srt => formats::srt_entries(&decoded),
            SourceFormat::Vtt => formats::vtt_entries(&decoded),
            SourceFormat::AssSsa => formats::ass_entries(&decoded),
            SourceFormat::Plain => formats::plain_entries(&decoded),
        };
        entries.join("\n")
    };

    let chars_before = document.raw_text().chars().count();
    let chars_after = text.chars().count();

    debug!(
        "Normalized {} input: {} -> {} characters",
        document.format(), chars_before, chars_after
    );

    if chars_after > options.max_text_length {
        return Err(SummarizeError::TooLong {
            actual: chars_after,
            max: options.max_text_length,
        });
    }

    Ok(NormalizedText {
        text,
        format: document.format(),
        encoding: document.encoding(),
        chars_before,
        chars_after,
    })
}

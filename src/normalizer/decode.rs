/*!
 * Byte-level decoding of input files.
 *
 * Handles byte order marks, UTF-16 input, legacy single- and multi-byte
 * charsets, and the binary sniff that decides whether undecodable input is
 * rejected or decoded lossily.
 */

use chardetng::EncodingDetector;
use log::{debug, warn};
use serde::Serialize;

use crate::errors::SummarizeError;

/// Number of leading bytes inspected by the binary sniff
const SNIFF_LEN: usize = 512;

/// Minimum share of text bytes for a sample to count as text
const MIN_TEXT_RATIO: f64 = 0.7;

/// Encoding the source text was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// Legacy charset found by detection, e.g. `windows-1252` or `GBK`
    Detected(&'static str),
    /// Invalid sequences were replaced with U+FFFD
    LossyUtf8,
}

impl SourceEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8 (bom)",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Detected(name) => *name,
            Self::LossyUtf8 => "utf-8 (lossy)",
        }
    }

    /// Whether characters may have been replaced during decoding
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::LossyUtf8)
    }
}

/// Whether a byte sample looks like binary data
pub fn looks_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(SNIFF_LEN)];
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    // Bytes >= 0x80 count as text so UTF-8 and legacy charsets pass
    let text_bytes = sample.iter()
        .filter(|b| matches!(**b, 9 | 10 | 13 | 32..=126) || **b >= 0x80)
        .count();
    (text_bytes as f64) / (sample.len() as f64) < MIN_TEXT_RATIO
}

/// Decode raw file bytes to text
///
/// UTF-16 is only recognised through its BOM. Text that is not valid UTF-8
/// goes through charset detection. Input that looks binary or that the
/// detected charset cannot decode cleanly is rejected unless `force_text`
/// is set, in which case it is decoded lossily.
pub fn decode_bytes(bytes: &[u8], force_text: bool) -> Result<(String, SourceEncoding), SummarizeError> {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return Ok((String::from_utf8_lossy(rest).into_owned(), SourceEncoding::Utf8Bom));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return Ok((decode_utf16(rest, u16::from_le_bytes), SourceEncoding::Utf16Le));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return Ok((decode_utf16(rest, u16::from_be_bytes), SourceEncoding::Utf16Be));
    }

    let binary = looks_binary(bytes);
    if !binary {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Ok((text.to_string(), SourceEncoding::Utf8));
        }
        if let Some(decoded) = decode_legacy(bytes) {
            return Ok(decoded);
        }
    }

    if force_text {
        warn!("Input is not decodable text, decoding lossily because text treatment was forced");
        return Ok((String::from_utf8_lossy(bytes).into_owned(), SourceEncoding::LossyUtf8));
    }

    let reason = if binary {
        "input appears to be binary (use --force-text to process anyway)"
    } else {
        "input is not in a recognised text encoding (use --force-text to process anyway)"
    };
    Err(SummarizeError::UnsupportedFormat(reason.to_string()))
}

/// Decode with the detected legacy charset; None when that leaves malformed sequences
fn decode_legacy(bytes: &[u8]) -> Option<(String, SourceEncoding)> {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, false);

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        debug!("Detected {} but the input does not decode cleanly", encoding.name());
        return None;
    }
    debug!("Input is not UTF-8, decoded as {}", encoding.name());
    Some((text.into_owned(), SourceEncoding::Detected(encoding.name())))
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Strip a leading BOM and unify line endings to `\n`
pub fn normalize_line_endings(text: &str) -> String {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

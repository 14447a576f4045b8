/*!
 * Format-specific markup stripping.
 *
 * Every parser turns decoded text (with `\n` line endings) into an ordered
 * list of dialogue entries with timing, numbering and styling removed.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

// @const: Cue timing line, SRT (`00:00:01,000`) or VTT (`00:01.000`) style
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\d{1,2}:)?\d{1,2}:\d{2}[,.]\d{1,3}\s*-->\s*(?:\d{1,2}:)?\d{1,2}:\d{2}[,.]\d{1,3}").unwrap()
});

// @const: HTML-like tags, VTT voice/class spans and inline timestamps
static MARKUP_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?(?:[A-Za-z][^<>]*|\d[\d:.,]*)>").unwrap()
});

// @const: ASS/SSA override blocks such as `{\an8}` or `{\c&H00FFFF&}`
static OVERRIDE_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{[^}]*\}").unwrap()
});

// @const: Backslash codes left over after override blocks are removed
static ASS_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\[A-Za-z]+\d*|\\\d+").unwrap()
});

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").unwrap()
});

/// Collapse inner whitespace runs and trim
fn squash_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

/// Remove inline markup from one subtitle line
fn strip_inline_markup(line: &str) -> String {
    let without_overrides = OVERRIDE_BLOCK_REGEX.replace_all(line, "");
    MARKUP_TAG_REGEX.replace_all(&without_overrides, "").into_owned()
}

/// Whether a line is a cue timing line
pub fn is_timing_line(line: &str) -> bool {
    TIMING_REGEX.is_match(line)
}

fn is_cue_number(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

/// Split text into blank-line separated blocks of trimmed lines
fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Join the text lines of one cue
fn cue_text(lines: &[&str]) -> String {
    let joined = lines.iter()
        .map(|line| strip_inline_markup(line))
        .collect::<Vec<_>>()
        .join(" ");
    squash_whitespace(&joined)
}

/// Dialogue of an SRT document, one entry per cue
pub fn srt_entries(text: &str) -> Vec<String> {
    let mut entries = Vec::new();

    for (block_index, block) in blocks(text).iter().enumerate() {
        let timings: Vec<usize> = block.iter()
            .enumerate()
            .filter(|(_, line)| is_timing_line(line))
            .map(|(i, _)| i)
            .collect();

        if timings.is_empty() {
            warn!("SRT block {} has no timing line, keeping its text", block_index + 1);
            let text = cue_text(block);
            if !text.is_empty() {
                entries.push(text);
            }
            continue;
        }

        // Cues missing their blank separator share a block; each timing line
        // starts a cue, and anything before the first one is the cue number
        for (n, &start) in timings.iter().enumerate() {
            let mut end = timings.get(n + 1).copied().unwrap_or(block.len());
            if n + 1 < timings.len() && end > start + 1 && is_cue_number(block[end - 1]) {
                end -= 1;
            }

            let text = cue_text(&block[start + 1..end]);
            if !text.is_empty() {
                entries.push(text);
            }
        }
    }

    debug!("Parsed {} SRT cues", entries.len());
    entries
}

/// Dialogue of a WebVTT document, one entry per cue
pub fn vtt_entries(text: &str) -> Vec<String> {
    let mut entries = Vec::new();

    for block in blocks(text) {
        let first = block[0];
        if first.starts_with("WEBVTT")
            || first.starts_with("NOTE")
            || first == "STYLE"
            || first == "REGION"
        {
            continue;
        }

        // Identifier lines precede the timing line; cue settings share it
        let Some(pos) = block.iter().position(|line| is_timing_line(line)) else {
            continue;
        };

        let text = cue_text(&block[pos + 1..]);
        if !text.is_empty() {
            entries.push(text);
        }
    }

    debug!("Parsed {} VTT cues", entries.len());
    entries
}

/// Clean the text field of an ASS/SSA dialogue line
pub fn clean_ass_text(text: &str) -> String {
    let text = OVERRIDE_BLOCK_REGEX.replace_all(text, "");
    let text = text.replace("\\N", " ").replace("\\n", " ").replace("\\h", " ");
    let text = ASS_CODE_REGEX.replace_all(&text, "");
    squash_whitespace(&text)
}

/// Dialogue of an ASS/SSA script, one entry per `Dialogue:` line
pub fn ass_entries(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut in_events = false;
    // Standard v4+ layout: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
    let mut field_count = 10;

    for line in text.lines() {
        let line = line.trim();

        if line.starts_with('[') {
            in_events = line.eq_ignore_ascii_case("[Events]");
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(format) = line.strip_prefix("Format:") {
            let fields: Vec<&str> = format.split(',').map(|f| f.trim()).collect();
            if fields.last().is_some_and(|f| f.eq_ignore_ascii_case("Text")) {
                field_count = fields.len();
            } else {
                warn!("ASS Format line does not end with Text, keeping {} fields", field_count);
            }
            continue;
        }

        if let Some(dialogue) = line.strip_prefix("Dialogue:") {
            let parts: Vec<&str> = dialogue.splitn(field_count, ',').collect();
            if parts.len() < field_count {
                warn!("Skipping malformed dialogue line: {}", line);
                continue;
            }
            let text = clean_ass_text(parts[field_count - 1]);
            if !text.is_empty() {
                entries.push(text);
            }
        }
    }

    debug!("Parsed {} ASS/SSA dialogue lines", entries.len());
    entries
}

/// Entries of a plain text document
///
/// With blank-line paragraphs each paragraph becomes one entry with its lines
/// joined by spaces; otherwise every non-empty line is an entry.
pub fn plain_entries(text: &str) -> Vec<String> {
    if text.contains("\n\n") {
        blocks(text).iter()
            .map(|paragraph| squash_whitespace(&paragraph.join(" ")))
            .filter(|p| !p.is_empty())
            .collect()
    } else {
        text.lines()
            .map(squash_whitespace)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

/*!
 * Cleanup of raw model completions.
 *
 * Reasoning models wrap their output in thinking blocks, chatty models add
 * preambles and sign-offs. Everything here only removes text around the
 * summary; the summary body itself is never rewritten.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SanitizeError;

/// Tags whose content is model reasoning
const REASONING_TAGS: [&str; 4] = ["think", "thinking", "reasoning", "redacted_reasoning"];

/// Nested blocks are removed from the inside out, one level per pass
const TAG_PASSES: usize = 3;

// @const: One regex per reasoning tag: closed block, unclosed block up to the end
static REASONING_BLOCK_REGEXES: Lazy<Vec<(Regex, Regex)>> = Lazy::new(|| {
    REASONING_TAGS.iter()
        .map(|tag| {
            let closed = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap();
            let unclosed = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*\z")).unwrap();
            (closed, unclosed)
        })
        .collect()
});

// @const: Stray opening or closing reasoning tags
static ORPHAN_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:think|thinking|reasoning|redacted_reasoning)\b[^>]*>").unwrap()
});

static THINKING_COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<!--\s*thinking.*?-->").unwrap()
});

// @const: A fence around the whole response
static WRAPPING_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```[A-Za-z]*[ \t]*\n(.*?)\n?```\s*\z").unwrap()
});

// @const: Lines in which the model talks about what it is going to do
static META_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Okay|Let me|I need to|I should|I'll|I will)\b").unwrap()
});

// @const: Openers that are also common in summaries, meta only when self-referential
static WEAK_META_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:First|Let's)\b").unwrap()
});

static FIRST_PERSON_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:I|me|my|we|us)\b").unwrap()
});

// @const: Lead-ins such as "Here is a summary of the text:"
static PREAMBLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:sure[,!.]?\s*|certainly[,!.]?\s*|of course[,!.]?\s*)?(?:here(?:'s| is| are)\b.*|below is\b.*)\s*:\s*$").unwrap()
});

// @const: Closing offers such as "Let me know if you need more detail."
static SIGN_OFF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:let me know\b|i hope this\b|feel free to\b|if you (?:need|have|want|would like)\b|would you like\b)").unwrap()
});

static PLACEHOLDER_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:thinking|reasoning|\.{1,3})?[ \t]*$").unwrap()
});

static EXCESS_NEWLINES_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").unwrap()
});

/// Remove reasoning blocks and orphan tags
fn strip_reasoning(text: &str) -> String {
    let mut text = text.to_string();
    for _ in 0..TAG_PASSES {
        for (closed, unclosed) in REASONING_BLOCK_REGEXES.iter() {
            text = closed.replace_all(&text, "").into_owned();
            text = unclosed.replace_all(&text, "").into_owned();
        }
    }
    let text = ORPHAN_TAG_REGEX.replace_all(&text, "");
    THINKING_COMMENT_REGEX.replace_all(&text, "").into_owned()
}

/// Content lines of a markdown summary start with a heading or bold marker
fn is_content_line(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("**")
}

/// Whether a leading line is the model talking about the task
fn is_meta_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    if lower.contains("summary") || lower.contains("conclusion") {
        return false;
    }
    META_LINE_REGEX.is_match(line)
        || (WEAK_META_LINE_REGEX.is_match(line) && (line.ends_with(':') || FIRST_PERSON_REGEX.is_match(line)))
}

/// Drop meta-commentary and lead-ins before the first content line
///
/// Meta lines are only dropped when body text follows them.
fn strip_leading_meta(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut start = 0;
    let mut first_meta = None;

    while start < lines.len() {
        let line = lines[start].trim();
        if line.is_empty() {
            start += 1;
            continue;
        }
        if is_content_line(line) {
            break;
        }

        if PREAMBLE_REGEX.is_match(line) {
            start += 1;
            continue;
        }
        if is_meta_line(line) {
            first_meta.get_or_insert(start);
            start += 1;
            continue;
        }
        break;
    }

    if start == lines.len() {
        if let Some(first) = first_meta {
            start = first;
        }
    }

    lines[start..].join("\n")
}

/// Drop trailing offers of further help
fn strip_trailing_sign_off(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    while let Some(last) = lines.last() {
        let line = last.trim();
        if line.is_empty() || SIGN_OFF_REGEX.is_match(line) {
            lines.pop();
        } else {
            break;
        }
    }
    lines.join("\n")
}

/// Clean a raw completion
///
/// Fails when nothing is left, which callers treat like a retryable provider
/// error.
pub fn sanitize(raw: &str) -> Result<String, SanitizeError> {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = strip_reasoning(&text);

    let trimmed = text.trim();
    let text = match WRAPPING_FENCE_REGEX.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    };

    let text = strip_leading_meta(&text);
    let text = strip_trailing_sign_off(&text);

    let text = text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let text = PLACEHOLDER_LINE_REGEX.replace_all(&text, "");
    let text = EXCESS_NEWLINES_REGEX.replace_all(&text, "\n\n");
    let text = text.trim().to_string();

    if text.is_empty() {
        debug!("Completion of {} chars was empty after sanitizing", raw.chars().count());
        return Err(SanitizeError { raw_chars: raw.chars().count() });
    }

    Ok(text)
}

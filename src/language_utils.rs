/*!
 * Language utilities for summary language handling.
 *
 * Summary languages are given as ISO 639-1 / 639-3 codes, optionally with a
 * region subtag (`zh-tw`, `pt_BR`). Prompts need a human-readable name.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// Regional variants whose name differs from the base language
const REGIONAL_NAMES: [(&str, &str); 4] = [
    ("zh-cn", "Simplified Chinese"),
    ("zh-hans", "Simplified Chinese"),
    ("zh-tw", "Traditional Chinese"),
    ("zh-hant", "Traditional Chinese"),
];

/// Lowercase the tag and unify the region separator
pub fn normalize_language_tag(code: &str) -> String {
    code.trim().to_lowercase().replace('_', "-")
}

/// Primary subtag of a language tag (`pt-br` -> `pt`)
fn primary_subtag(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let tag = normalize_language_tag(code);

    if let Some((_, name)) = REGIONAL_NAMES.iter().find(|(t, _)| *t == tag) {
        return Ok(name.to_string());
    }

    let primary = primary_subtag(&tag);
    let lang = match primary.len() {
        2 => Language::from_639_1(primary),
        3 => Language::from_639_3(primary),
        _ => None,
    };

    lang.map(|l| l.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Name to use in prompts; unknown codes are assumed to already be a name
pub fn language_display_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.trim().to_string())
}

/// Whether the summary language is English
pub fn is_english(code: &str) -> bool {
    let tag = normalize_language_tag(code);
    primary_subtag(&tag) == "en" || tag == "eng" || tag == "english"
}

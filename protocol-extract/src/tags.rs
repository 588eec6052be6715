//! Tagged-section scanning over raw model output.
//!
//! The model is asked to wrap each structured section in a literal
//! `NAME_START` ... `NAME_END` marker pair. Everything outside those pairs is
//! free narrative for the coordinator.

use std::sync::LazyLock;

use regex::Regex;

/// Any `UPPER_SNAKE_START` through the nearest following `UPPER_SNAKE_END`.
static TAGGED_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)[A-Z_]+_START.*?[A-Z_]+_END").expect("tagged span pattern is valid")
});

/// Return the trimmed text between the first `start_tag` and the first
/// `end_tag` that follows it.
///
/// Absent or unterminated sections yield an empty string. Later duplicates of
/// the same section are ignored.
pub fn extract_section<'a>(raw: &'a str, start_tag: &str, end_tag: &str) -> &'a str {
    let Some(start) = raw.find(start_tag) else {
        return "";
    };
    let body_start = start + start_tag.len();
    match raw[body_start..].find(end_tag) {
        Some(len) => raw[body_start..body_start + len].trim(),
        None => "",
    }
}

/// Remove every tagged span from `raw` and trim what is left.
pub fn strip_tagged_sections(raw: &str) -> String {
    TAGGED_SPAN.replace_all(raw, "").trim().to_string()
}

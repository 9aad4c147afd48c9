//! Markup stripping for free-text fields.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::NOT_AVAILABLE;

/// Anything between `<` and the nearest following `>`, across newlines.
const TAG_PATTERN: &str = r"(?s)<.*?>";

fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(TAG_PATTERN).expect("valid regex"))
}

/// Remove all `<...>` markup and trim surrounding whitespace.
///
/// Absent input yields an empty string.
pub fn sanitize(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    if !raw.contains('<') {
        return raw.trim().to_string();
    }
    tag_regex().replace_all(raw, "").trim().to_string()
}

/// Like [`sanitize`], but yields `"N/A"` when nothing is left.
pub fn sanitize_or_default(raw: Option<&str>) -> String {
    let text = sanitize(raw);
    if text.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        text
    }
}

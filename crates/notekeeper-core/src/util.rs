//! Small text helpers shared by config parsing and error reporting.

const EXCERPT_CHARS: usize = 180;

/// Trimmed text, or `None` when nothing but whitespace is left.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn has_scheme(value: &str, schemes: &[&str]) -> bool {
    value
        .split_once("://")
        .is_some_and(|(scheme, rest)| !rest.is_empty() && schemes.contains(&scheme))
}

pub fn is_http_url(value: &str) -> bool {
    has_scheme(value, &["http", "https"])
}

pub fn is_ws_url(value: &str) -> bool {
    has_scheme(value, &["ws", "wss"])
}

/// Single-line excerpt of a response body, for error messages.
pub fn compact_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(EXCERPT_CHARS)
        .collect()
}

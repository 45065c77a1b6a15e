//! Text processing utilities.

use regex::Regex;
use std::sync::OnceLock;

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

/// Collapse runs of whitespace to one space and trim both ends.
///
/// `"enter  username\n"` and `"enter username"` normalize to the same string.
pub fn normalize_whitespace(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    whitespace_re().replace_all(s, " ").trim().to_string()
}

/// Shorten `s` to at most `max_len` characters, ending in `"..."` when cut.
///
/// Counts chars, not bytes. For `max_len <= 3` only dots are returned.
pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }

    let byte_offset = s
        .char_indices()
        .nth(max_len - 3)
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    format!("{}...", &s[..byte_offset])
}

/// Locate the JSON payload inside a chatty LLM reply.
///
/// Checked in order: a ` ```json ` fence, a bare ` ``` ` fence, then the span
/// from the first `{` to the last `}`, then the span from the first `[` to
/// the last `]`. The returned slice is not guaranteed to parse.
pub fn extract_json_from_response(s: &str) -> Option<&str> {
    extract_fenced_block(s, "```json")
        .or_else(|| extract_fenced_block(s, "```"))
        .or_else(|| delimited_span(s, '{', '}'))
        .or_else(|| delimited_span(s, '[', ']'))
}

fn delimited_span(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}

/// Body of the first fenced block opened by `fence`, if non-empty.
fn extract_fenced_block<'a>(s: &'a str, fence: &str) -> Option<&'a str> {
    let after_fence = s.find(fence)? + fence.len();
    let content_start = after_fence + s[after_fence..].find('\n')? + 1;
    let close = s[content_start..].find("```")?;
    let content = s[content_start..content_start + close].trim();

    (!content.is_empty()).then_some(content)
}

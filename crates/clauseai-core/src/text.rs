//! Text helpers shared by the corpus builder and error reporting.
//!
//! Clause excerpts arrive with hard line breaks, tabs and runs of spaces from
//! PDF extraction. Everything stored in the corpus goes through
//! [`normalize_whitespace`] so that deduplication and embedding see one
//! canonical form.
//!
//! Model output echoed back to callers is untrusted and unbounded, so it is
//! cut with [`bounded_prefix`] before it reaches a log line or an error body.

/// Maximum number of characters of raw model output echoed in error details.
pub const RAW_PREVIEW_CHARS: usize = 300;

/// Collapse every whitespace run into a single space and trim both ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of whitespace-separated words.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// The first `max_chars` characters of `s`, never splitting a code point.
pub fn bounded_prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// [`bounded_prefix`] with [`RAW_PREVIEW_CHARS`].
pub fn raw_preview(s: &str) -> &str {
    bounded_prefix(s, RAW_PREVIEW_CHARS)
}

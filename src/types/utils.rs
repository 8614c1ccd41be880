//! Shared utility functions for text handling and error filtering.
//!
//! - `truncate_chars` - char-boundary-safe truncation used before persisting
//! - `estimate_tokens` - fallback usage estimate when a provider omits it
//! - `log_filter_error` - discard row-mapping errors with visibility

use std::fmt::Display;

// =============================================================================
// String Utilities
// =============================================================================

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate and mark the cut with an ellipsis.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    let cut = truncate_chars(s, max_chars);
    if cut.len() < s.len() {
        format!("{}...", cut)
    } else {
        cut.to_string()
    }
}

/// Capitalize the first character of a string.
#[inline]
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

// =============================================================================
// Error Filtering
// =============================================================================

/// Filter an iterator of Results, logging errors at debug level before discarding.
///
/// # Example
/// ```ignore
/// let rows: Vec<_> = rows
///     .filter_map(|r| log_filter_error(r, "mapping pattern row"))
///     .collect();
/// ```
pub fn log_filter_error<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!("{}: {}", context, e);
            None
        }
    }
}

// =============================================================================
// Token Estimation
// =============================================================================

/// Rough token estimate: 4 ASCII chars per token, 1.5 for everything else.
pub fn estimate_tokens(content: &str) -> u64 {
    let (ascii, other) = content.chars().fold((0u64, 0u64), |(a, o), c| {
        if c.is_ascii() { (a + 1, o) } else { (a, o + 1) }
    });
    ascii / 4 + (other as f64 / 1.5) as u64
}

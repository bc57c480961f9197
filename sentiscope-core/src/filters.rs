//! Pure checks applied to collected text before it reaches the classifier.

use chrono::{DateTime, Duration, Utc};

/// Longest input, in characters, handed to a fixed-length sentiment model.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 512;

/// Bodies Reddit substitutes for moderated or withdrawn content.
pub const REMOVAL_MARKERS: [&str; 2] = ["[removed]", "[deleted]"];

const LINK_MARKER: &str = "http";

/// True when `timestamp` is no older than `window` relative to `now`.
///
/// The boundary `timestamp == now - window` is inside the window.
pub fn in_window(timestamp: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    match now.checked_sub_signed(window) {
        Some(cutoff) => timestamp >= cutoff,
        None => true,
    }
}

/// Decides whether a raw text body is worth classifying.
///
/// Rejects blank bodies, removal markers and anything that looks like it
/// carries a link. Comparison is case-insensitive on the trimmed text.
pub fn is_acceptable(raw_text: &str) -> bool {
    let normalized = raw_text.trim().to_lowercase();
    if normalized.is_empty() {
        return false;
    }
    if REMOVAL_MARKERS.contains(&normalized.as_str()) {
        return false;
    }
    !normalized.contains(LINK_MARKER)
}

/// Cuts `text` to at most `max_len` characters, never splitting a code point.
pub fn truncate(text: &str, max_len: usize) -> &str {
    match text.char_indices().nth(max_len) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

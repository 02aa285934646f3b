//! Removal of the doubled-identifier artifact some RFID tags produce.
//!
//! Affected tags emit their identifier twice with no separator. When the
//! first `window` characters equal the next `window` characters the leading
//! copy is dropped. This is a fixed-width heuristic, not deduplication:
//! anything shorter than two windows, or whose halves differ, passes
//! through untouched.

use washbay_core::constants::DEFAULT_DUPLICATE_WINDOW;

/// Strip a duplicated leading identifier of `window` characters.
///
/// Works on character boundaries, so multi-byte input is safe.
///
/// # Examples
///
/// ```
/// use washbay_protocol::normalize::strip_duplicate;
///
/// assert_eq!(strip_duplicate("abcabc", 3), "abc");
/// assert_eq!(strip_duplicate("abcabd", 3), "abcabd");
/// assert_eq!(strip_duplicate("abcab", 3), "abcab");
/// ```
#[must_use]
pub fn strip_duplicate(value: &str, window: usize) -> &str {
    if window == 0 {
        return value;
    }

    let mut boundaries = value.char_indices().map(|(idx, _)| idx).chain([value.len()]);
    let Some(first_end) = boundaries.nth(window) else {
        return value;
    };
    let Some(second_end) = boundaries.nth(window - 1) else {
        return value;
    };

    if value[..first_end] == value[first_end..second_end] {
        &value[first_end..]
    } else {
        value
    }
}

/// Normalize a decoded RFID identifier using the standard 36-character
/// window (the length of a canonical UUID).
#[must_use]
pub fn normalize_identifier(value: &str) -> &str {
    strip_duplicate(value, DEFAULT_DUPLICATE_WINDOW)
}

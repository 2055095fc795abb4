//! ANSI escape code handling utilities
//!
//! Debug adapters and test runners colour their console output. The engine
//! keeps the producer's payload untouched as opaque content, but every
//! classifier, the search matcher and the exclusion rules operate on the
//! plain text obtained here.

use regex::Regex;
use std::sync::LazyLock;

/// Regex pattern for ANSI escape sequences.
///
/// Covers:
/// - CSI sequences: ESC [ ... letter (colors, cursor, etc.)
/// - OSC sequences: ESC ] ... BEL or ST (hyperlinks, titles)
/// - Simple escapes: ESC letter
/// - Caret notation: ^[ ... (emitted by tools that escape control characters)
static ANSI_ESCAPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \x1b\[[0-9;?]*[A-Za-z]               # CSI sequences
        | \x1b\][^\x07\x1b]*(?:\x07|\x1b\\)  # OSC sequences
        | \x1b[A-Za-z]                       # Simple escapes
        | \^\[\[[0-9;?]*[A-Za-z]             # ^[[ caret-notation CSI
        ",
    )
    .expect("ANSI regex pattern is valid")
});

/// Strip all ANSI escape sequences from a string.
///
/// # Examples
///
/// ```
/// use logdeck_core::strip_ansi_codes;
///
/// let input = "\x1b[31mred text\x1b[0m";
/// assert_eq!(strip_ansi_codes(input), "red text");
/// ```
pub fn strip_ansi_codes(input: &str) -> String {
    ANSI_ESCAPE_PATTERN.replace_all(input, "").into_owned()
}

/// Check if a string contains ANSI escape sequences.
pub fn contains_ansi_codes(input: &str) -> bool {
    ANSI_ESCAPE_PATTERN.is_match(input)
}

/// Check whether `word` occurs in `haystack` as a whole word.
///
/// Both arguments are compared ASCII case-insensitively; the caller passes the
/// keyword in lower case. A word boundary is any non-alphanumeric character
/// (or the start/end of the string), so `error` matches `Error: x` and
/// `[error]` but not `ErrorBoundary` or `terror`.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() || haystack.len() < word.len() {
        return false;
    }

    let hay = haystack.as_bytes();
    let needle = word.as_bytes();

    let mut start = 0;
    while start + needle.len() <= hay.len() {
        let window = &hay[start..start + needle.len()];
        if window.eq_ignore_ascii_case(needle) {
            let before_ok = start == 0 || !hay[start - 1].is_ascii_alphanumeric();
            let end = start + needle.len();
            let after_ok = end == hay.len() || !hay[end].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return true;
            }
        }
        start += 1;
    }

    false
}

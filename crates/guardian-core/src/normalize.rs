//! Text normalization.
//!
//! The normalized form feeds both the signal collectors and the cache key, so
//! any change here invalidates every cached response.

use unicode_normalization::UnicodeNormalization;

/// Normalizes text for matching and cache keying.
///
/// Applies NFKC, lowercases, drops control and zero-width characters and
/// collapses runs of whitespace into single spaces with no leading or
/// trailing whitespace. The function is total and idempotent.
pub fn normalize(text: &str) -> String {
    // Invisible characters go first so that the marks around them compose.
    let visible: String = text.chars().filter_map(visible_char).collect();

    // NFKC runs again after lowercasing: compatibility characters such as
    // U+210C fold to uppercase letters that only lowercase on a second pass.
    let folded: String = visible
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .nfkc()
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn visible_char(c: char) -> Option<char> {
    if c.is_whitespace() {
        Some(' ')
    } else if c.is_control() || is_zero_width(c) {
        None
    } else {
        Some(c)
    }
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

//! Text normalisation shared by the row normaliser and the dashboard.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Collapses inner whitespace and trims. Returns `None` for blank input.
pub(crate) fn normalize_display(input: &str) -> Option<String> {
    let mut out = String::new();
    for token in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    if out.is_empty() { None } else { Some(out) }
}

/// Case and accent insensitive key: `"Alimentação  "` and `"alimentacao"`
/// share the key `"alimentacao"`. Non alphanumeric runs become `sep`.
pub(crate) fn normalize_key_with(input: &str, sep: char) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut out = String::new();
    let mut prev_sep = false;
    for ch in trimmed.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_sep = false;
        } else if !out.is_empty() && !prev_sep {
            out.push(sep);
            prev_sep = true;
        }
    }
    let normalized = out.trim_end_matches(sep);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Grouping key for free-text labels such as categories.
pub(crate) fn normalize_key(input: &str) -> Option<String> {
    normalize_key_with(input, ' ')
}

/// Status/kind token: `"Em andamento"` → `"em_andamento"`.
pub(crate) fn status_token(input: &str) -> Option<String> {
    normalize_key_with(input, '_')
}

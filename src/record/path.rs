//! Crawl path strings
//!
//! A crawl path is the display string `seed -> page -> ... -> url` recording
//! how a URL was first reached. Paths are built incrementally from the
//! parent's (possibly already shortened) path and kept within a character
//! bound.

const SEPARATOR: &str = " -> ";
const ELLIPSIS_SEPARATOR: &str = " -> ... -> ";

/// Appends `link` to `parent` and shortens the result to `max_len` characters
///
/// Shortening keeps the start of the path and its last hop:
/// `start -> ... -> end`. If the end hop alone is too long it is cut to fit,
/// and if not even the start fits the whole string is cut and marked with
/// `...`.
///
/// # Examples
///
/// ```
/// use linkwatch::record::extend_path;
///
/// assert_eq!(extend_path("https://a.com/", "https://a.com/b", 255), "https://a.com/ -> https://a.com/b");
/// ```
pub fn extend_path(parent: &str, link: &str, max_len: usize) -> String {
    let full = format!("{}{}{}", parent, SEPARATOR, link);
    if char_len(&full) <= max_len {
        return full;
    }

    let parts: Vec<&str> = full.split(SEPARATOR).collect();
    if parts.len() <= 2 {
        return hard_truncate(&full, max_len);
    }

    let start = parts[0];
    let end = parts[parts.len() - 1];
    let reserved = char_len(start) + char_len(ELLIPSIS_SEPARATOR);

    match max_len.checked_sub(reserved) {
        Some(available) if available >= char_len(end) => {
            format!("{}{}{}", start, ELLIPSIS_SEPARATOR, end)
        }
        Some(available) if available > 0 => {
            format!("{}{}{}", start, ELLIPSIS_SEPARATOR, take_chars(end, available))
        }
        _ => hard_truncate(&full, max_len),
    }
}

fn hard_truncate(s: &str, max_len: usize) -> String {
    if char_len(s) <= max_len {
        return s.to_string();
    }
    format!("{}...", take_chars(s, max_len.saturating_sub(3)))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

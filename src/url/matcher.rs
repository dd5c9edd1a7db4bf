/// Checks if a domain matches a boundary pattern
///
/// `example.com` matches only itself; `*.example.com` matches the bare domain
/// and any subdomain at any depth.
///
/// # Examples
///
/// ```
/// use linkwatch::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "shop.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.com.evil.net"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Returns the first exclusion pattern contained in the URL, if any
pub fn matching_exclusion<'a>(patterns: &'a [String], url: &str) -> Option<&'a str> {
    patterns
        .iter()
        .map(String::as_str)
        .find(|pattern| url.contains(pattern))
}

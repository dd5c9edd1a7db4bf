//! HTML parser for extracting links
//!
//! Every reference a page makes is returned, including non-HTTP schemes, so
//! that the crawler can record them. Each link carries whether it was
//! rendered as a visible anchor.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A reference found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Absolute URL (fragment still attached)
    pub url: Url,
    /// Found in an anchor outside any hidden subtree
    pub visible: bool,
}

/// Links extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub links: Vec<DiscoveredLink>,
}

/// Parses HTML content and extracts links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href>` and `<area href>`, visible unless hidden
/// - `<link rel="canonical" href>`, never visible
/// - `mailto:`, `tel:` and `javascript:` references (recorded, never fetched)
///
/// **Skip:**
/// - `<a download>`
/// - Empty and fragment-only hrefs
/// - `data:` URIs
///
/// A `<base href>` element, when present, replaces `base_url` for resolution.
///
/// # Example
///
/// ```
/// use linkwatch::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.links[0].url.as_str(), "https://example.com/page");
/// assert!(parsed.links[0].visible);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let base = document_base(&document, base_url);

    let mut links = Vec::new();

    if let Ok(anchor_selector) = Selector::parse("a[href], area[href]") {
        for element in document.select(&anchor_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, &base)) {
                links.push(DiscoveredLink {
                    url,
                    visible: !is_hidden(&element),
                });
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, &base)) {
                links.push(DiscoveredLink {
                    url,
                    visible: false,
                });
            }
        }
    }

    ParsedPage { links }
}

fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves an href against the base URL
///
/// Returns None for hrefs that are not references to another resource.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
    {
        return None;
    }

    base_url.join(href).ok()
}

/// Returns true if the element or one of its ancestors is hidden
fn is_hidden(element: &ElementRef) -> bool {
    if hides(element) {
        return true;
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| hides(&ancestor))
}

fn hides(element: &ElementRef) -> bool {
    let value = element.value();

    if matches!(value.name(), "noscript" | "template") {
        return true;
    }
    if value.attr("hidden").is_some() {
        return true;
    }
    if value
        .attr("aria-hidden")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }

    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

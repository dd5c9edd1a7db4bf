//! URL handling module for Linkwatch
//!
//! This module provides URL normalization, host extraction, wildcard matching,
//! and the site boundary rule deciding which discovered links are traversed.

mod domain;
mod matcher;
mod normalize;

use crate::config::SiteEntry;
use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, host_key};
pub use matcher::{matches_wildcard, matching_exclusion};
pub use normalize::{identity_of, normalize_parsed, normalize_url};

/// Where a discovered URL sits relative to the crawl boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkScope {
    /// Inside the site: fetched, and parsed for further links
    Internal,
    /// Another site: recorded, never fetched
    External,
    /// Inside the site but matching an exclusion pattern
    Excluded(String),
}

/// Crawl boundary for one site
///
/// A URL is internal when its host matches one of the domain patterns. Any
/// other host is external. Exclusion patterns are substring matches on the
/// full URL and win over the domain patterns.
#[derive(Debug, Clone)]
pub struct SiteScope {
    region: String,
    seed: Url,
    domains: Vec<String>,
    exclude: Vec<String>,
}

impl SiteScope {
    /// Builds the scope for a configured site
    ///
    /// When no domain patterns are configured the seed host is the boundary.
    pub fn from_site(site: &SiteEntry) -> Result<Self, UrlError> {
        let seed = normalize_url(&site.seed)?;
        let domains = if site.domains.is_empty() {
            vec![extract_domain(&seed).ok_or(UrlError::MissingDomain)?]
        } else {
            site.domains.iter().map(|d| d.to_lowercase()).collect()
        };

        Ok(Self {
            region: site.region.clone(),
            seed,
            domains,
            exclude: site.exclude.clone(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Classifies a URL against the boundary
    ///
    /// # Examples
    ///
    /// ```
    /// use linkwatch::config::SiteEntry;
    /// use linkwatch::url::{LinkScope, SiteScope};
    /// use url::Url;
    ///
    /// let scope = SiteScope::from_site(&SiteEntry {
    ///     region: "AU".to_string(),
    ///     seed: "https://example.com/".to_string(),
    ///     domains: vec!["*.example.com".to_string()],
    ///     exclude: vec!["careers".to_string()],
    /// })
    /// .unwrap();
    ///
    /// let url = Url::parse("https://shop.example.com/a").unwrap();
    /// assert_eq!(scope.scope_of(&url), LinkScope::Internal);
    /// ```
    pub fn scope_of(&self, url: &Url) -> LinkScope {
        let Some(host) = extract_domain(url) else {
            return LinkScope::External;
        };

        if !self
            .domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, &host))
        {
            return LinkScope::External;
        }

        match matching_exclusion(&self.exclude, url.as_str()) {
            Some(pattern) => LinkScope::Excluded(pattern.to_string()),
            None => LinkScope::Internal,
        }
    }

    /// Returns true if redirects to this URL may be followed
    pub fn is_internal(&self, url: &Url) -> bool {
        self.scope_of(url) == LinkScope::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_scope(domains: Vec<&str>, exclude: Vec<&str>) -> SiteScope {
        SiteScope::from_site(&SiteEntry {
            region: "AU".to_string(),
            seed: "https://www.example.com.au/".to_string(),
            domains: domains.into_iter().map(String::from).collect(),
            exclude: exclude.into_iter().map(String::from).collect(),
        })
        .unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_seed_host_is_default_boundary() {
        let scope = create_test_scope(vec![], vec![]);
        assert_eq!(
            scope.scope_of(&url("https://www.example.com.au/page")),
            LinkScope::Internal
        );
        assert_eq!(
            scope.scope_of(&url("https://shop.example.com.au/page")),
            LinkScope::External
        );
    }

    #[test]
    fn test_wildcard_boundary() {
        let scope = create_test_scope(vec!["*.example.com.au"], vec![]);
        assert_eq!(
            scope.scope_of(&url("https://shop.example.com.au/page")),
            LinkScope::Internal
        );
        assert_eq!(
            scope.scope_of(&url("https://facebook.com/example")),
            LinkScope::External
        );
    }

    #[test]
    fn test_exclusion_inside_boundary() {
        let scope = create_test_scope(vec!["*.example.com.au"], vec!["careers", "jobs."]);
        assert_eq!(
            scope.scope_of(&url("https://jobs.example.com.au/")),
            LinkScope::Excluded("jobs.".to_string())
        );
        assert_eq!(
            scope.scope_of(&url("https://www.example.com.au/careers/apply")),
            LinkScope::Excluded("careers".to_string())
        );
    }

    #[test]
    fn test_exclusion_does_not_make_external_internal() {
        let scope = create_test_scope(vec![], vec!["careers"]);
        assert_eq!(
            scope.scope_of(&url("https://other.com/careers")),
            LinkScope::External
        );
    }

    #[test]
    fn test_region_and_seed() {
        let scope = create_test_scope(vec![], vec![]);
        assert_eq!(scope.region(), "AU");
        assert_eq!(scope.seed().as_str(), "https://www.example.com.au/");
    }
}

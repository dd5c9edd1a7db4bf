//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Following redirects manually, inside the crawl boundary only
//! - Retrying transient transport failures with backoff
//! - Mapping reqwest errors onto transport error kinds

use super::retry::RetryPolicy;
use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::status::{FetchOutcome, HttpResponse, TransportErrorKind};
use crate::url::SiteScope;
use reqwest::{header, redirect::Policy, Client};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry::RetryIf;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// Redirects are disabled so the fetcher can apply the crawl boundary and
/// hop bound itself.
///
/// # Example
///
/// ```no_run
/// use linkwatch::config::UserAgentConfig;
/// use linkwatch::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "linkwatch".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "ops@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(3)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(request_timeout)
        .connect_timeout(request_timeout)
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a reqwest error onto a transport error kind
pub fn transport_kind(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_body() || error.is_decode() {
        TransportErrorKind::Body
    } else if error.is_request() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    }
}

/// Transport failure of a single attempt
#[derive(Debug)]
struct TransportFailure {
    kind: TransportErrorKind,
    message: String,
}

/// Result of fetching one URL, retries included
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    pub attempts: u32,
}

/// Fetches URLs for one site
///
/// Cheap to share between tasks behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    scope: SiteScope,
    retry: RetryPolicy,
    max_redirects: u32,
}

impl Fetcher {
    pub fn new(client: Client, scope: SiteScope, retry: RetryPolicy, config: &CrawlerConfig) -> Self {
        Self {
            client,
            scope,
            retry,
            max_redirects: config.max_redirects,
        }
    }

    /// Fetches a URL, retrying transient transport failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Any HTTP response (2xx-5xx) | Conclusive, no retry |
    /// | Timeout, connect, reset, body read failure | Retry with backoff up to the attempt cap |
    /// | Other client errors | Conclusive |
    ///
    /// The body is only read when `read_body` is set and the final response
    /// is a successful HTML page.
    pub async fn fetch(&self, url: &Url, read_body: bool) -> FetchReport {
        // Counts every call of the action, the first attempt included
        let attempts = AtomicU32::new(0);

        let result = RetryIf::spawn(
            self.retry.strategy(),
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                self.attempt(url, read_body, attempt)
            },
            |failure: &TransportFailure| failure.kind.is_transient(),
        )
        .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(failure) => FetchOutcome::Transport {
                kind: failure.kind,
                message: failure.message,
            },
        };

        FetchReport {
            outcome,
            attempts: attempts.into_inner(),
        }
    }

    /// One attempt, with transport failures split out as the error side
    async fn attempt(
        &self,
        url: &Url,
        read_body: bool,
        attempt: u32,
    ) -> Result<FetchOutcome, TransportFailure> {
        match self.fetch_once(url, read_body).await {
            FetchOutcome::Transport { kind, message } => {
                tracing::debug!(
                    "Attempt {}/{} for {} failed ({}): {}",
                    attempt,
                    self.retry.max_attempts(),
                    url,
                    kind.label(),
                    message
                );
                Err(TransportFailure { kind, message })
            }
            outcome => Ok(outcome),
        }
    }

    /// Performs one attempt, following in-scope redirects
    async fn fetch_once(&self, url: &Url, read_body: bool) -> FetchOutcome {
        let mut current = url.clone();
        let mut chain: Vec<String> = Vec::new();

        loop {
            let response = match self.client.get(current.clone()).send().await {
                Ok(response) => response,
                Err(e) => {
                    return FetchOutcome::Transport {
                        kind: transport_kind(&e),
                        message: e.to_string(),
                    }
                }
            };

            let status = response.status();
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|loc| current.join(loc.trim()).ok())
                    .map(|mut target| {
                        target.set_fragment(None);
                        target
                    });

                if let Some(target) = location {
                    let target_str = target.to_string();
                    let looped =
                        target == current || chain.iter().any(|hop| *hop == target_str);
                    let in_scope = self.scope.is_internal(&target);
                    let hops_left = (chain.len() as u32) < self.max_redirects;

                    if !looped && in_scope && hops_left {
                        tracing::trace!("Following redirect {} -> {}", current, target);
                        chain.push(current.to_string());
                        current = target;
                        continue;
                    }

                    return FetchOutcome::Response(HttpResponse {
                        status: status.as_u16(),
                        final_url: current.to_string(),
                        redirect_chain: chain,
                        location: Some(target_str),
                        location_in_scope: in_scope,
                        content_type,
                        body: None,
                    });
                }
            }

            let is_html = content_type
                .as_deref()
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));

            let body = if read_body && status.is_success() && is_html {
                match response.text().await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        return FetchOutcome::Transport {
                            kind: transport_kind(&e),
                            message: e.to_string(),
                        }
                    }
                }
            } else {
                None
            };

            return FetchOutcome::Response(HttpResponse {
                status: status.as_u16(),
                final_url: current.to_string(),
                redirect_chain: chain,
                location: None,
                location_in_scope: false,
                content_type,
                body,
            });
        }
    }
}

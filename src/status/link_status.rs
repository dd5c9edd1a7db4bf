//! Link classification
//!
//! Turns the outcome of a fetch (an HTTP response, a transport failure, or a
//! decision not to fetch at all) into a [`LinkStatus`]. Classification is a
//! pure function of the outcome.

use serde::Serialize;
use std::fmt;

/// Kind of network-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The request hit its per-request timeout
    Timeout,
    /// DNS, connection refused/reset, or TLS handshake failure
    Connect,
    /// The connection dropped while reading the body
    Body,
    /// The connection failed while sending the request
    Request,
    /// Anything else reported by the HTTP stack
    Other,
}

impl TransportErrorKind {
    /// Returns true if a retry may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Symbolic label used in CSV exports and snapshot tables
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connection_error",
            Self::Body => "body_error",
            Self::Request => "request_error",
            Self::Other => "transport_error",
        }
    }

    /// Parses a symbolic label produced by [`label`](Self::label)
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(Self::Timeout),
            "connection_error" => Some(Self::Connect),
            "body_error" => Some(Self::Body),
            "request_error" => Some(Self::Request),
            "transport_error" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Why a link was recorded without being checked
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Non-HTTP scheme such as `mailto:`, `tel:` or `javascript:`
    Scheme(String),
    /// Host outside the crawl boundary
    External,
    /// Matched a configured exclusion pattern
    Pattern(String),
}

/// Why a checked link is broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokenReason {
    /// 4xx/5xx (or an unusable 3xx) final status
    Http(u16),
    /// Redirect chain longer than the hop bound
    TooManyRedirects,
    /// Redirect chain pointing back at a URL already in it
    RedirectLoop,
}

/// Final status of a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// 2xx, possibly after following redirects
    Ok,
    /// Conclusive failure
    Broken(BrokenReason),
    /// Redirect leaving the crawl boundary; the target is not checked
    Redirect(String),
    /// Network-level failure after all retries
    TransportError(TransportErrorKind),
    /// Not checked and never counted as broken
    Excluded(ExclusionReason),
}

impl LinkStatus {
    /// Returns true if this status belongs in the broken-link report
    ///
    /// Transport errors are reported as broken, tagged with their kind.
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken(_) | Self::TransportError(_))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn category(&self) -> StatusCategory {
        match self {
            Self::Ok => StatusCategory::Ok,
            Self::Broken(_) => StatusCategory::Broken,
            Self::Redirect(_) => StatusCategory::Redirect,
            Self::TransportError(_) => StatusCategory::TransportError,
            Self::Excluded(_) => StatusCategory::Excluded,
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Broken(BrokenReason::Http(code)) => write!(f, "broken ({})", code),
            Self::Broken(BrokenReason::TooManyRedirects) => write!(f, "broken (too many redirects)"),
            Self::Broken(BrokenReason::RedirectLoop) => write!(f, "broken (redirect loop)"),
            Self::Redirect(target) => write!(f, "redirect to {}", target),
            Self::TransportError(kind) => write!(f, "transport error ({})", kind.label()),
            Self::Excluded(ExclusionReason::Scheme(scheme)) => {
                write!(f, "excluded ({} scheme)", scheme)
            }
            Self::Excluded(ExclusionReason::External) => write!(f, "excluded (external)"),
            Self::Excluded(ExclusionReason::Pattern(p)) => write!(f, "excluded (pattern {})", p),
        }
    }
}

/// Coarse status buckets used for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Ok,
    Broken,
    Redirect,
    TransportError,
    Excluded,
}

impl StatusCategory {
    pub fn all() -> [Self; 5] {
        [
            Self::Ok,
            Self::Broken,
            Self::Redirect,
            Self::TransportError,
            Self::Excluded,
        ]
    }
}

/// Final HTTP response of a fetch, after any redirects were followed
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Status code of the last response received
    pub status: u16,
    /// URL that produced the last response
    pub final_url: String,
    /// URLs that answered with a followed redirect, in order
    pub redirect_chain: Vec<String>,
    /// Resolved `Location` of a final 3xx response, if any
    pub location: Option<String>,
    /// Whether `location` is inside the crawl boundary
    pub location_in_scope: bool,
    /// `Content-Type` of the last response
    pub content_type: Option<String>,
    /// Body, only read for internal HTML pages
    pub body: Option<String>,
}

/// What happened when a link was (or was not) fetched
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Response(HttpResponse),
    Transport {
        kind: TransportErrorKind,
        message: String,
    },
    Skipped(ExclusionReason),
}

/// Classifies a fetch outcome
///
/// # Policy
///
/// | Outcome | Status |
/// |---------|--------|
/// | 2xx | Ok (redirects already followed are recorded by the caller) |
/// | 3xx without a usable `Location` | Broken(code) |
/// | 3xx pointing back into its own chain | Broken(RedirectLoop) |
/// | 3xx leaving the crawl boundary | Redirect(target) |
/// | 3xx still followable (hop bound reached) | Broken(TooManyRedirects) |
/// | 4xx/5xx and anything else | Broken(code) |
/// | Transport failure | TransportError(kind) |
/// | Not fetched | Excluded(reason) |
pub fn classify(outcome: &FetchOutcome) -> LinkStatus {
    match outcome {
        FetchOutcome::Skipped(reason) => LinkStatus::Excluded(reason.clone()),
        FetchOutcome::Transport { kind, .. } => LinkStatus::TransportError(*kind),
        FetchOutcome::Response(response) => classify_response(response),
    }
}

fn classify_response(response: &HttpResponse) -> LinkStatus {
    match response.status {
        200..=299 => LinkStatus::Ok,
        300..=399 => match &response.location {
            None => LinkStatus::Broken(BrokenReason::Http(response.status)),
            Some(target)
                if *target == response.final_url
                    || response.redirect_chain.iter().any(|hop| hop == target) =>
            {
                LinkStatus::Broken(BrokenReason::RedirectLoop)
            }
            Some(target) if !response.location_in_scope => LinkStatus::Redirect(target.clone()),
            Some(_) => LinkStatus::Broken(BrokenReason::TooManyRedirects),
        },
        code => LinkStatus::Broken(BrokenReason::Http(code)),
    }
}

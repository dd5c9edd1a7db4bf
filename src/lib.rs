//! Linkwatch: a broken-link tracker
//!
//! This crate crawls a website breadth-first, verifies that every discovered
//! link resolves, and keeps a dated, time-series record of broken links so that
//! regressions can be spotted day over day.

pub mod config;
pub mod crawler;
pub mod diff;
pub mod output;
pub mod record;
pub mod status;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Linkwatch operations
///
/// Per-URL failures (timeouts, 404s, redirect loops) are never represented
/// here: they are data carried by [`record::VisitResult`]. Only failures that
/// abort a run end up as a `LinkwatchError`.
#[derive(Debug, Error)]
pub enum LinkwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Seed {url} is unreachable: {reason}")]
    SeedUnreachable { url: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },

    #[error("Report error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkwatchError {
    /// Returns true for configuration and connectivity failures
    ///
    /// These are reported to the operator differently from storage failures:
    /// the run never started producing data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::SeedUnreachable { .. } | Self::Url(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown site region: {0}")]
    UnknownRegion(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Linkwatch operations
pub type Result<T> = std::result::Result<T, LinkwatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl_site, CrawlOutcome};
pub use diff::{diff, Comparison, Delta};
pub use record::{BrokenLinkRecord, LinkIdentity, RecordStatus, VisitResult};
pub use status::{classify, LinkStatus};
pub use storage::{SnapshotStore, SqliteSnapshotStore};
pub use crate::url::{normalize_url, LinkScope, SiteScope};

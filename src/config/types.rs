use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Linkwatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

impl Config {
    /// Looks up a site by its region code (case-insensitive)
    pub fn site(&self, region: &str) -> Option<&SiteEntry> {
        self.sites
            .iter()
            .find(|site| site.region.eq_ignore_ascii_case(region))
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent fetches across all hosts
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Maximum number of concurrent fetches against a single host
    #[serde(rename = "max-requests-per-host")]
    pub max_requests_per_host: u32,

    /// Minimum time between request starts to the same host (milliseconds)
    #[serde(rename = "minimum-request-interval")]
    pub minimum_request_interval: u64,

    /// Hard per-request timeout (milliseconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Maximum number of redirect hops followed before a link is broken
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Maximum length of the crawl path display string
    #[serde(rename = "max-path-length", default = "default_max_path_length")]
    pub max_path_length: usize,

    /// Optional bound on the number of URLs tracked in one crawl
    #[serde(rename = "max-urls", default)]
    pub max_urls: Option<usize>,

    /// Optional run-level deadline (seconds)
    #[serde(default)]
    pub deadline: Option<u64>,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    pub fn minimum_request_interval(&self) -> Duration {
        Duration::from_millis(self.minimum_request_interval)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline.map(Duration::from_secs)
    }
}

fn default_max_redirects() -> u32 {
    10
}

fn default_max_path_length() -> usize {
    255
}

/// Retry policy for transient transport failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per URL, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "initial-backoff")]
    pub initial_backoff: u64,

    /// Growth factor applied to the delay after each retry
    #[serde(rename = "backoff-multiplier")]
    pub backoff_multiplier: u64,

    /// Upper bound on any single delay (milliseconds)
    #[serde(rename = "max-backoff", default = "default_max_backoff")]
    pub max_backoff: u64,

    /// Randomize each delay to avoid synchronized retries
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: 1000,
            backoff_multiplier: 2,
            max_backoff: default_max_backoff(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff)
    }
}

fn default_max_backoff() -> u64 {
    30_000
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Snapshot store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    /// Path to the SQLite database holding the dated tables
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Number of days a snapshot is kept
    #[serde(rename = "retention-days", default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    60
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `<region>_broken_links.csv` exports
    #[serde(rename = "csv-dir", default = "default_csv_dir")]
    pub csv_dir: String,

    /// Path to the markdown delta report
    #[serde(rename = "report-path", default = "default_report_path")]
    pub report_path: String,

    /// Path to the JSON delta document
    #[serde(rename = "delta-path", default = "default_delta_path")]
    pub delta_path: String,

    /// Path to the CSV listing every Added and Removed link
    #[serde(rename = "changes-path", default = "default_changes_path")]
    pub changes_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_dir: default_csv_dir(),
            report_path: default_report_path(),
            delta_path: default_delta_path(),
            changes_path: default_changes_path(),
        }
    }
}

fn default_csv_dir() -> String {
    ".".to_string()
}

fn default_report_path() -> String {
    "broken_links_report.md".to_string()
}

fn default_delta_path() -> String {
    "broken_links_delta.json".to_string()
}

fn default_changes_path() -> String {
    "changes_all.csv".to_string()
}

/// A site to crawl, identified by its region code
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Region identifier (e.g., "AU", "NZ")
    pub region: String,

    /// URL the crawl starts from
    pub seed: String,

    /// Domain patterns inside the crawl boundary (e.g., "*.example.com").
    /// Defaults to the seed host when empty.
    #[serde(default)]
    pub domains: Vec<String>,

    /// Substring patterns that exclude a URL from checking
    #[serde(default)]
    pub exclude: Vec<String>,
}

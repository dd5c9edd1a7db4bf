//! Crawler module: the crawler engine and its parts
//!
//! This module contains the core crawling logic, including:
//! - The frontier and visited tracker
//! - HTTP fetching with manual redirects and retry/backoff
//! - HTML parsing and link extraction with visibility
//! - Politeness scheduling
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod retry;
mod scheduler;

pub use coordinator::{crawl_site, Coordinator, CrawlOutcome};
pub use fetcher::{build_http_client, transport_kind, FetchReport, Fetcher};
pub use frontier::{Enqueued, Frontier, TrackedUrl, UrlNode};
pub use parser::{parse_html, DiscoveredLink, ParsedPage};
pub use retry::RetryPolicy;
pub use scheduler::Scheduler;

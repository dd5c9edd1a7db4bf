//! Statistics for a finished crawl
//!
//! This module provides functionality for summarizing a crawl's visit results
//! and printing them after the run.

use crate::crawler::CrawlOutcome;
use crate::status::StatusCategory;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Region the crawl covered
    pub region: String,

    /// Total number of visit results
    pub total_urls: u64,

    /// Count of results by status category
    pub by_category: HashMap<StatusCategory, u64>,

    /// Results inside the crawl boundary
    pub internal_urls: u64,

    /// Broken links that appear as visible anchors
    pub visible_broken: u64,

    /// Results that needed more than one attempt
    pub retried: u64,

    /// Total requests made, retries included
    pub requests: u64,

    pub elapsed_seconds: f64,
    pub truncated: bool,
    pub cancelled: bool,
}

impl CrawlStatistics {
    pub fn count(&self, category: StatusCategory) -> u64 {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    /// Broken links plus transport errors
    pub fn broken(&self) -> u64 {
        self.count(StatusCategory::Broken) + self.count(StatusCategory::TransportError)
    }
}

/// Computes statistics from a crawl outcome
pub fn compute_statistics(outcome: &CrawlOutcome) -> CrawlStatistics {
    let mut by_category = HashMap::new();
    let mut internal_urls = 0;
    let mut visible_broken = 0;
    let mut retried = 0;
    let mut requests = 0;

    for result in &outcome.results {
        *by_category.entry(result.status.category()).or_insert(0) += 1;
        if result.is_internal {
            internal_urls += 1;
        }
        if result.status.is_broken() && result.is_visible_link {
            visible_broken += 1;
        }
        if result.attempts > 1 {
            retried += 1;
        }
        requests += u64::from(result.attempts);
    }

    CrawlStatistics {
        region: outcome.region.clone(),
        total_urls: outcome.results.len() as u64,
        by_category,
        internal_urls,
        visible_broken,
        retried,
        requests,
        elapsed_seconds: outcome.elapsed.as_secs_f64(),
        truncated: outcome.truncated,
        cancelled: outcome.cancelled,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ({}) ===\n", stats.region);

    println!("Overview:");
    println!("  URLs checked: {}", stats.total_urls);
    println!("  Internal URLs: {}", stats.internal_urls);
    println!("  Requests made: {}", stats.requests);
    println!("  URLs retried: {}", stats.retried);
    println!("  Elapsed: {:.1}s", stats.elapsed_seconds);
    println!();

    println!("URLs by Status:");
    for category in StatusCategory::all() {
        let count = stats.count(category);
        let percentage = if stats.total_urls > 0 {
            (count as f64 / stats.total_urls as f64) * 100.0
        } else {
            0.0
        };
        println!("  {:?}: {} ({:.1}%)", category, count, percentage);
    }
    println!();

    println!(
        "Broken links: {} ({} visible)",
        stats.broken(),
        stats.visible_broken
    );

    if stats.truncated {
        println!("Note: crawl was truncated at the URL limit");
    }
    if stats.cancelled {
        println!("Note: crawl was cancelled at the deadline");
    }
}

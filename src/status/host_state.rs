use crate::config::CrawlerConfig;
use std::time::{Duration, Instant};

/// Tracks politeness state for one host during crawling
///
/// The coordinator owns one of these per host key and consults it before
/// dispatching each request.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests dispatched to this host in the current crawl
    pub request_count: u64,

    /// Number of requests currently in flight against this host
    pub in_flight: u32,

    /// When the last request to this host was dispatched
    pub last_request_time: Option<Instant>,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a request can be dispatched to this host now
    ///
    /// This method enforces:
    /// - The per-host concurrent request cap
    /// - The minimum interval between request starts
    pub fn can_request(&self, config: &CrawlerConfig, now: Instant) -> bool {
        if self.in_flight >= config.max_requests_per_host {
            return false;
        }

        self.time_until_next_request(config, now).is_none()
    }

    /// Records that a request was dispatched to this host
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.in_flight += 1;
        self.last_request_time = Some(now);
    }

    /// Records that a request to this host finished
    pub fn record_completion(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Calculates the time until the minimum interval has elapsed
    ///
    /// Returns None if the interval allows a request now. The concurrency
    /// cap is not a timed condition and is not reflected here.
    pub fn time_until_next_request(
        &self,
        config: &CrawlerConfig,
        now: Instant,
    ) -> Option<Duration> {
        let last = self.last_request_time?;
        let min_delay = config.minimum_request_interval();
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_delay {
            Some(min_delay - elapsed)
        } else {
            None
        }
    }
}

//! Politeness scheduling
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-host concurrency caps
//! - Minimum delays between requests to the same host

use crate::config::CrawlerConfig;
use crate::status::HostState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Longest the coordinator sleeps before re-checking the queue
const MAX_IDLE_WAIT: Duration = Duration::from_millis(100);

/// Slack added so a host is definitely ready when the coordinator wakes
const WAKE_BUFFER: Duration = Duration::from_millis(10);

/// Scheduler decides when a queued URL may be dispatched
///
/// The scheduler coordinates:
/// - Global concurrency limits (worker pool size)
/// - Per-host concurrency limits
/// - Per-host minimum time between request starts
///
/// It does not own the queue; the coordinator asks it about each candidate.
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    /// Per-host state tracking
    host_states: HashMap<String, HostState>,

    /// Crawler configuration
    config: CrawlerConfig,
}

impl Scheduler {
    pub fn new(config: CrawlerConfig) -> Self {
        let global_semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests as usize));

        Self {
            global_semaphore,
            host_states: HashMap::new(),
            config,
        }
    }

    /// Takes a worker slot, or None if the pool is full
    pub fn try_acquire_worker(&self) -> Option<OwnedSemaphorePermit> {
        self.global_semaphore.clone().try_acquire_owned().ok()
    }

    /// Returns true if a request to `host` may start now
    pub fn can_dispatch(&self, host: &str, now: Instant) -> bool {
        self.host_states
            .get(host)
            .map_or(true, |state| state.can_request(&self.config, now))
    }

    /// Records that a request to `host` was dispatched
    pub fn record_dispatch(&mut self, host: &str, now: Instant) {
        self.host_states
            .entry(host.to_string())
            .or_insert_with(HostState::new)
            .record_request(now);
    }

    /// Records that a request to `host` finished
    pub fn record_completion(&mut self, host: &str) {
        if let Some(state) = self.host_states.get_mut(host) {
            state.record_completion();
        }
    }

    /// Calculates how long to wait before any of `hosts` may be ready
    ///
    /// Hosts blocked only by their concurrency cap are woken by completions,
    /// so they do not shorten the wait.
    pub fn time_until_ready<'a, I>(&self, hosts: I, now: Instant) -> Duration
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut min_wait = MAX_IDLE_WAIT;

        for host in hosts {
            match self.host_states.get(host) {
                Some(state) => {
                    if let Some(wait) = state.time_until_next_request(&self.config, now) {
                        min_wait = min_wait.min(wait + WAKE_BUFFER);
                    } else if state.in_flight < self.config.max_requests_per_host {
                        return Duration::ZERO;
                    }
                }
                None => return Duration::ZERO,
            }
        }

        min_wait
    }

    /// Number of requests dispatched to `host`
    pub fn request_count(&self, host: &str) -> u64 {
        self.host_states
            .get(host)
            .map_or(0, |state| state.request_count)
    }

    /// Number of distinct hosts contacted
    pub fn hosts_contacted(&self) -> usize {
        self.host_states.len()
    }
}

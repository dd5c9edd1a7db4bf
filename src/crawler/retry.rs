//! Bounded retry policy for transient transport failures

use crate::config::RetryConfig;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};

/// Exponential backoff with optional jitter
///
/// The wait after failed attempt `n` (1-based) is
/// `initial * multiplier^(n-1)`, capped at the configured maximum. With
/// jitter, each wait is scaled by a random factor in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: u64,
    max_backoff: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            multiplier: config.backoff_multiplier.max(1),
            max_backoff: config.max_backoff(),
            jitter: config.jitter,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delays between attempts, for use with `tokio_retry::RetryIf`
    ///
    /// Yields `max_attempts - 1` delays, so the first attempt plus one
    /// attempt per delay never exceeds the cap.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> + Send {
        let initial = self.initial_backoff;
        let max_backoff = self.max_backoff;
        let with_jitter = self.jitter;

        let initial_ms = u64::try_from(initial.as_millis()).unwrap_or(u64::MAX);
        let growth = ExponentialBackoff::from_millis(self.multiplier)
            .factor(initial_ms)
            .max_delay(max_backoff);

        std::iter::once(initial.min(max_backoff))
            .chain(growth)
            .map(move |delay| if with_jitter { jitter(delay) } else { delay })
            .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

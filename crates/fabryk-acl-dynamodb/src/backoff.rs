//! Quadratic backoff schedule for batch-read retries.
//!
//! Retry `n` (1-based) waits `n² × unit`: with the default one-second unit
//! that is 1s, 4s, 9s, 16s, ... There is no jitter. The schedule is unbounded
//! unless a maximum number of retries is set.

use backon::BackoffBuilder;
use std::time::Duration;

/// Builder for [`QuadraticBackoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadraticBackoffBuilder {
    unit: Duration,
    max_times: Option<u32>,
}

impl QuadraticBackoffBuilder {
    /// Unbounded schedule with the given unit.
    pub fn new(unit: Duration) -> Self {
        Self {
            unit,
            max_times: None,
        }
    }

    /// Stop after `max_times` delays (`None` for no limit).
    pub fn with_max_times(mut self, max_times: Option<u32>) -> Self {
        self.max_times = max_times;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.unit.saturating_mul(retry.saturating_mul(retry))
    }
}

impl Default for QuadraticBackoffBuilder {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl BackoffBuilder for QuadraticBackoffBuilder {
    type Backoff = QuadraticBackoff;

    fn build(self) -> Self::Backoff {
        QuadraticBackoff {
            builder: self,
            retries: 0,
        }
    }
}

/// Iterator of `n² × unit` delays.
#[derive(Debug, Clone)]
pub struct QuadraticBackoff {
    builder: QuadraticBackoffBuilder,
    retries: u32,
}

impl QuadraticBackoff {
    /// Delays handed out so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl Iterator for QuadraticBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if let Some(max) = self.builder.max_times {
            if self.retries >= max {
                return None;
            }
        }
        self.retries = self.retries.saturating_add(1);
        Some(self.builder.delay_for(self.retries))
    }
}

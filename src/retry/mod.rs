//! Fixed-interval waits used by the consumption loop
//!
//! A failed fetch is retried forever on the same iterator, waiting
//! `fetch_error_backoff` between attempts. A successful iteration waits the
//! shorter `poll_interval` before fetching again.

mod backoff;

pub use backoff::{Backoff, FixedBackoff};

use std::time::Duration;

/// Configuration for fetch retries and polling cadence
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay after a failed fetch before retrying with the same iterator
    pub fetch_error_backoff: Duration,
    /// Delay between successful fetches
    pub poll_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            fetch_error_backoff: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> FixedBackoff {
        FixedBackoff::new(self.fetch_error_backoff)
    }
}

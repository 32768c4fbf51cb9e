use std::time::Duration;
use tracing::trace;

/// Trait defining backoff behavior
pub trait Backoff: Send + Sync {
    /// Calculate the delay before the given attempt is retried
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Waits the same amount of time after every failure
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Backoff for FixedBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        trace!(attempt = attempt, delay_ms = ?self.delay.as_millis(), "Fixed backoff delay");
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff() {
        let backoff = FixedBackoff::new(Duration::from_millis(100));

        for attempt in 0..5 {
            assert_eq!(backoff.next_delay(attempt), Duration::from_millis(100));
        }
        assert_eq!(backoff.next_delay(u32::MAX), Duration::from_millis(100));
    }
}

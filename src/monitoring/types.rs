use std::time::{Duration, SystemTime};

use crate::forwarder::DeliveryOutcome;
use crate::shutdown::ShutdownReason;

/// Configuration for the monitoring system
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Whether monitoring is enabled
    pub enabled: bool,
    /// Size of the monitoring channel buffer
    pub channel_size: usize,
    /// How often the aggregator logs its counters
    pub metrics_interval: Duration,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_size: 1000,
            metrics_interval: Duration::from_secs(60),
        }
    }
}

/// Represents a monitoring event from the consumption loop
#[derive(Debug, Clone)]
pub struct ProcessingEvent {
    /// When the event occurred
    pub timestamp: SystemTime,
    /// ID of the shard being consumed
    pub shard_id: String,
    /// The type of event and its details
    pub event_type: ProcessingEventType,
}

/// The different types of events that can occur during processing
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingEventType {
    Iterator {
        event_type: IteratorEventType,
        error: Option<String>,
    },
    /// A fetch failed and the loop is about to wait before retrying
    FetchRetry {
        attempt: u32,
        error: String,
        delay: Duration,
    },
    BatchFetched {
        record_count: usize,
        millis_behind_latest: Option<i64>,
    },
    RecordForwarded {
        sequence_number: String,
        url: String,
        outcome: DeliveryOutcome,
    },
    RecordSkipped {
        sequence_number: String,
        checkpoint_saved: bool,
    },
    RecordUndecodable {
        sequence_number: String,
        error: String,
    },
    Stopped {
        reason: Option<ShutdownReason>,
    },
}

/// Types of iterator events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorEventType {
    /// Initial iterator obtained at startup
    Acquired,
    /// Transport reported the iterator as expired
    Expired,
    /// Replacement iterator obtained after expiry
    Renewed,
    /// Failed to get an iterator
    Failed,
}

impl ProcessingEvent {
    fn new(shard_id: String, event_type: ProcessingEventType) -> Self {
        Self {
            timestamp: SystemTime::now(),
            shard_id,
            event_type,
        }
    }

    pub fn iterator(shard_id: String, event_type: IteratorEventType, error: Option<String>) -> Self {
        Self::new(shard_id, ProcessingEventType::Iterator { event_type, error })
    }

    pub fn fetch_retry(shard_id: String, attempt: u32, error: String, delay: Duration) -> Self {
        Self::new(
            shard_id,
            ProcessingEventType::FetchRetry {
                attempt,
                error,
                delay,
            },
        )
    }

    pub fn batch_fetched(
        shard_id: String,
        record_count: usize,
        millis_behind_latest: Option<i64>,
    ) -> Self {
        Self::new(
            shard_id,
            ProcessingEventType::BatchFetched {
                record_count,
                millis_behind_latest,
            },
        )
    }

    pub fn record_forwarded(
        shard_id: String,
        sequence_number: String,
        url: String,
        outcome: DeliveryOutcome,
    ) -> Self {
        Self::new(
            shard_id,
            ProcessingEventType::RecordForwarded {
                sequence_number,
                url,
                outcome,
            },
        )
    }

    pub fn record_skipped(shard_id: String, sequence_number: String, checkpoint_saved: bool) -> Self {
        Self::new(
            shard_id,
            ProcessingEventType::RecordSkipped {
                sequence_number,
                checkpoint_saved,
            },
        )
    }

    pub fn record_undecodable(shard_id: String, sequence_number: String, error: String) -> Self {
        Self::new(
            shard_id,
            ProcessingEventType::RecordUndecodable {
                sequence_number,
                error,
            },
        )
    }

    pub fn stopped(shard_id: String, reason: Option<ShutdownReason>) -> Self {
        Self::new(shard_id, ProcessingEventType::Stopped { reason })
    }
}

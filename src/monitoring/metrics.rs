use super::types::{IteratorEventType, ProcessingEvent, ProcessingEventType};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;
use tracing::{debug, info, trace, warn};

/// Running counters for the consumed shard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwarderMetrics {
    pub batches_fetched: u64,
    pub records_fetched: u64,
    pub records_forwarded: u64,
    pub delivery_failures: u64,
    pub records_skipped: u64,
    pub checkpoint_failures: u64,
    pub decode_failures: u64,
    pub fetch_retries: u64,
    pub iterator_renewals: u64,
    pub iterator_failures: u64,
    pub max_millis_behind_latest: i64,
}

/// Aggregates monitoring events into metrics
pub struct MetricsAggregator {
    metrics: Arc<RwLock<ForwarderMetrics>>,
    window_duration: Duration,
    monitoring_rx: mpsc::Receiver<ProcessingEvent>,
}

impl MetricsAggregator {
    pub fn new(window_duration: Duration, monitoring_rx: mpsc::Receiver<ProcessingEvent>) -> Self {
        Self {
            metrics: Arc::new(RwLock::new(ForwarderMetrics::default())),
            window_duration,
            monitoring_rx,
        }
    }

    /// Shared handle to the counters, readable while `run` is in progress
    pub fn metrics(&self) -> Arc<RwLock<ForwarderMetrics>> {
        self.metrics.clone()
    }

    /// Consumes events until the processor drops its sender, logging the
    /// counters every window and once more at the end.
    pub async fn run(mut self) -> ForwarderMetrics {
        let mut ticker = interval(self.window_duration);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                event = self.monitoring_rx.recv() => match event {
                    Some(event) => self.process_event(event).await,
                    None => break,
                },
                _ = ticker.tick() => self.emit_metrics().await,
            }
        }

        self.emit_metrics().await;
        self.metrics.read().await.clone()
    }

    pub async fn process_event(&self, event: ProcessingEvent) {
        let mut metrics = self.metrics.write().await;

        match event.event_type {
            ProcessingEventType::Iterator { event_type, error } => match event_type {
                IteratorEventType::Acquired => {
                    trace!(shard_id = %event.shard_id, "Initial iterator acquired");
                }
                IteratorEventType::Expired => {
                    debug!(shard_id = %event.shard_id, "Iterator expired");
                }
                IteratorEventType::Renewed => {
                    metrics.iterator_renewals += 1;
                }
                IteratorEventType::Failed => {
                    metrics.iterator_failures += 1;
                    debug!(shard_id = %event.shard_id, error = ?error, "Iterator operation failed");
                }
            },
            ProcessingEventType::FetchRetry { .. } => {
                metrics.fetch_retries += 1;
            }
            ProcessingEventType::BatchFetched {
                record_count,
                millis_behind_latest,
            } => {
                metrics.batches_fetched += 1;
                metrics.records_fetched += record_count as u64;
                if let Some(behind) = millis_behind_latest {
                    metrics.max_millis_behind_latest = metrics.max_millis_behind_latest.max(behind);
                }
            }
            ProcessingEventType::RecordForwarded { outcome, .. } => {
                if outcome.is_delivered() {
                    metrics.records_forwarded += 1;
                } else {
                    metrics.delivery_failures += 1;
                }
            }
            ProcessingEventType::RecordSkipped {
                checkpoint_saved, ..
            } => {
                metrics.records_skipped += 1;
                if !checkpoint_saved {
                    metrics.checkpoint_failures += 1;
                }
            }
            ProcessingEventType::RecordUndecodable { .. } => {
                metrics.decode_failures += 1;
            }
            ProcessingEventType::Stopped { reason } => {
                debug!(shard_id = %event.shard_id, reason = ?reason, "Processor stopped");
            }
        }
    }

    async fn emit_metrics(&self) {
        let metrics = self.metrics.read().await;

        info!(
            batches_fetched = metrics.batches_fetched,
            records_fetched = metrics.records_fetched,
            records_forwarded = metrics.records_forwarded,
            records_skipped = metrics.records_skipped,
            delivery_failures = metrics.delivery_failures,
            decode_failures = metrics.decode_failures,
            fetch_retries = metrics.fetch_retries,
            iterator_renewals = metrics.iterator_renewals,
            max_millis_behind_latest = metrics.max_millis_behind_latest,
            "Forwarder metrics"
        );

        if metrics.checkpoint_failures > 0 {
            warn!(
                failures = metrics.checkpoint_failures,
                "Checkpoint failures detected"
            );
        }

        if metrics.iterator_failures > 0 {
            warn!(
                failures = metrics.iterator_failures,
                "Iterator failures detected"
            );
        }
    }
}

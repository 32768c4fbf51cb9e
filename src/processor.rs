//! Consumption loop for a single Kinesis shard
//!
//! This module drives the forwarder. It handles:
//!
//! - Resuming from the stored checkpoint, or from "now" without one
//! - Fetching batches with fixed-backoff retries on the same iterator
//! - Routing each record through the rule set
//! - Forwarding matches and checkpointing records that match nothing
//! - Stopping cleanly on a shutdown request or a closed shard

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, trace, warn};

use crate::client::{KinesisClientError, KinesisClientTrait, RecordBatch, StreamRecord};
use crate::cursor::{Cursor, CursorAdvance, CursorManager, StartingPosition};
use crate::error::{ProcessorError, Result};
use crate::forwarder::{DeliveryOutcome, Forwarder};
use crate::monitoring::{IteratorEventType, MonitoringConfig, ProcessingEvent};
use crate::retry::{Backoff, RetryConfig};
use crate::rules::{decode_message, RuleSet};
use crate::shutdown::{ShutdownReason, ShutdownSignal};
use crate::store::CheckpointStore;

/// Shard read when none is configured
pub const DEFAULT_SHARD_ID: &str = "shardId-000000000000";

/// Configuration for the forwarding processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Name of the Kinesis stream to read
    pub stream_name: String,
    /// The single shard consumed by this process
    pub shard_id: String,
    /// Maximum number of records to request per GetRecords call
    pub batch_size: i32,
    /// Fetch retry and polling intervals
    pub retry: RetryConfig,
    /// Warn when the shard reports being further behind than this
    pub lag_warning_threshold: Option<Duration>,
    /// Monitoring configuration
    pub monitoring: MonitoringConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            stream_name: String::new(),
            shard_id: DEFAULT_SHARD_ID.to_string(),
            batch_size: 50,
            retry: RetryConfig::default(),
            lag_warning_threshold: Some(Duration::from_secs(60)),
            monitoring: MonitoringConfig::default(),
        }
    }
}

/// Lifecycle of the consumption loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    /// The shard is closed; the last batch is being processed
    Draining,
    Stopped,
}

/// What happened to a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDisposition {
    Forwarded(DeliveryOutcome),
    /// Matched no rule; `checkpointed` is false if the save failed
    Skipped { checkpointed: bool },
    /// Payload could not be decoded; neither forwarded nor checkpointed
    Undecodable,
}

/// Internal context holding processor dependencies
struct ProcessingContext<C, F, S> {
    client: Arc<C>,
    forwarder: Arc<F>,
    store: Arc<S>,
    rules: Arc<RuleSet>,
    cursors: CursorManager<C>,
    backoff: Box<dyn Backoff>,
    config: ProcessorConfig,
    monitoring_tx: Option<mpsc::Sender<ProcessingEvent>>,
}

impl<C, F, S> ProcessingContext<C, F, S> {
    /// Publishes a monitoring event without ever blocking the loop
    fn send_monitoring_event(&self, event: ProcessingEvent) {
        if let Some(tx) = &self.monitoring_tx {
            match tx.try_send(event) {
                Ok(()) => trace!("Sent monitoring event successfully"),
                Err(TrySendError::Full(_)) => debug!("Monitoring channel full, dropping event"),
                Err(TrySendError::Closed(_)) => trace!("Monitoring channel closed"),
            }
        }
    }

    fn shard_id(&self) -> String {
        self.config.shard_id.clone()
    }
}

/// Forwards records from one Kinesis shard to HTTP endpoints
///
/// # Examples
///
/// ```rust,no_run
/// use kinesis_forwarder::{
///     FileCheckpointStore, ForwardingProcessor, HttpForwarder, ProcessorConfig, RuleSet,
///     ShutdownCoordinator,
/// };
///
/// async fn run(client: aws_sdk_kinesis::Client) -> anyhow::Result<()> {
///     let config = ProcessorConfig {
///         stream_name: "events".to_string(),
///         ..Default::default()
///     };
///     let rules = RuleSet::load("filters.json")?;
///     let coordinator = ShutdownCoordinator::new();
///     coordinator.listen_for_signals();
///
///     let (processor, _monitoring_rx) = ForwardingProcessor::new(
///         config,
///         rules,
///         client,
///         HttpForwarder::new(None)?,
///         FileCheckpointStore::default(),
///     );
///     processor.run(coordinator.signal()).await?;
///     Ok(())
/// }
/// ```
pub struct ForwardingProcessor<C, F, S>
where
    C: KinesisClientTrait + 'static,
    F: Forwarder + 'static,
    S: CheckpointStore + 'static,
{
    context: ProcessingContext<C, F, S>,
}

impl<C, F, S> ForwardingProcessor<C, F, S>
where
    C: KinesisClientTrait + 'static,
    F: Forwarder + 'static,
    S: CheckpointStore + 'static,
{
    /// Creates a new processor instance
    ///
    /// Returns the processor and, if monitoring is enabled, the receiving end
    /// of its event channel.
    pub fn new(
        config: ProcessorConfig,
        rules: RuleSet,
        client: C,
        forwarder: F,
        store: S,
    ) -> (Self, Option<mpsc::Receiver<ProcessingEvent>>) {
        let (monitoring_tx, monitoring_rx) = if config.monitoring.enabled {
            let (tx, rx) = mpsc::channel(config.monitoring.channel_size);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let client = Arc::new(client);
        let cursors = CursorManager::new(client.clone(), &config.stream_name, &config.shard_id);

        let context = ProcessingContext {
            client,
            forwarder: Arc::new(forwarder),
            store: Arc::new(store),
            rules: Arc::new(rules),
            cursors,
            backoff: Box::new(config.retry.backoff()),
            config,
            monitoring_tx,
        };

        (Self { context }, monitoring_rx)
    }

    /// Runs the consumption loop until shutdown
    ///
    /// Errors are only returned for startup failures (unreadable checkpoint,
    /// no initial iterator). Once the loop is running it always ends in
    /// `Ok(())`.
    pub async fn run(&self, mut shutdown: ShutdownSignal) -> Result<()> {
        let ctx = &self.context;
        info!(
            stream = %ctx.config.stream_name,
            shard_id = %ctx.config.shard_id,
            rules = ctx.rules.len(),
            "Starting Kinesis forwarder"
        );

        if ctx.rules.is_empty() {
            warn!("No routing rules configured, every record will be checkpointed as skipped");
        }

        let checkpoint = Self::initialize_checkpoint(ctx).await?;
        let mut resume = StartingPosition::from_checkpoint(checkpoint);
        let mut cursor = match ctx.cursors.acquire(&resume).await {
            Ok(cursor) => cursor,
            Err(e) => {
                ctx.send_monitoring_event(ProcessingEvent::iterator(
                    ctx.shard_id(),
                    IteratorEventType::Failed,
                    Some(e.to_string()),
                ));
                return Err(e);
            }
        };

        info!(
            shard_id = %ctx.config.shard_id,
            position = %resume,
            iterator = %cursor.as_str(),
            "Starting with shard iterator"
        );
        ctx.send_monitoring_event(ProcessingEvent::iterator(
            ctx.shard_id(),
            IteratorEventType::Acquired,
            None,
        ));

        let mut state = ConsumerState::Running;
        let mut stop_reason = None;

        while state != ConsumerState::Stopped {
            let batch = match Self::fetch_batch(ctx, &mut cursor, &resume, &mut shutdown).await {
                Some(batch) => batch,
                None => {
                    stop_reason = shutdown.pending();
                    break;
                }
            };

            Self::observe_lag(ctx, &batch);

            match ctx.cursors.advance(&batch) {
                CursorAdvance::Next(next) => cursor = next,
                CursorAdvance::Closed => {
                    info!(
                        shard_id = %ctx.config.shard_id,
                        "Shard closed, stopping after the current batch"
                    );
                    shutdown.request(ShutdownReason::PartitionClosed);
                    state = ConsumerState::Draining;
                }
            }

            Self::process_records(ctx, &batch.records, &mut resume).await;

            if let Some(reason) = shutdown.pending() {
                stop_reason = Some(reason);
                state = ConsumerState::Stopped;
            } else if let Some(reason) = shutdown.sleep(ctx.config.retry.poll_interval).await {
                stop_reason = Some(reason);
                state = ConsumerState::Stopped;
            }
        }

        info!(
            shard_id = %ctx.config.shard_id,
            reason = ?stop_reason,
            "Forwarder stopped"
        );
        ctx.send_monitoring_event(ProcessingEvent::stopped(ctx.shard_id(), stop_reason));
        Ok(())
    }

    /// Reads the stored checkpoint; a read failure is fatal
    async fn initialize_checkpoint(ctx: &ProcessingContext<C, F, S>) -> Result<Option<String>> {
        match ctx.store.load().await {
            Ok(Some(cp)) => {
                info!(
                    shard_id = %ctx.config.shard_id,
                    checkpoint = %cp,
                    "Retrieved existing checkpoint"
                );
                Ok(Some(cp))
            }
            Ok(None) => {
                info!(shard_id = %ctx.config.shard_id, "No existing checkpoint found, starting from now");
                Ok(None)
            }
            Err(e) => {
                error!(
                    shard_id = %ctx.config.shard_id,
                    error = %e,
                    "Failed to retrieve checkpoint"
                );
                Err(ProcessorError::CheckpointError(e.to_string()))
            }
        }
    }

    /// Fetches the next batch, retrying until it succeeds
    ///
    /// Failures are retried on the same iterator after a fixed backoff. An
    /// expired iterator is renewed from `resume` instead. Returns `None` only
    /// if shutdown is requested while waiting between attempts.
    async fn fetch_batch(
        ctx: &ProcessingContext<C, F, S>,
        cursor: &mut Cursor,
        resume: &StartingPosition,
        shutdown: &mut ShutdownSignal,
    ) -> Option<RecordBatch> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match ctx
                .client
                .get_records(cursor.as_str(), ctx.config.batch_size)
                .await
            {
                Ok(batch) => {
                    trace!(
                        shard_id = %ctx.config.shard_id,
                        records = batch.records.len(),
                        attempt = attempt,
                        "Fetched batch"
                    );
                    return Some(batch);
                }
                Err(KinesisClientError::ExpiredIterator) => {
                    warn!(
                        shard_id = %ctx.config.shard_id,
                        position = %resume,
                        "Iterator expired, renewing"
                    );
                    ctx.send_monitoring_event(ProcessingEvent::iterator(
                        ctx.shard_id(),
                        IteratorEventType::Expired,
                        None,
                    ));

                    match ctx.cursors.acquire(resume).await {
                        Ok(renewed) => {
                            *cursor = renewed;
                            ctx.send_monitoring_event(ProcessingEvent::iterator(
                                ctx.shard_id(),
                                IteratorEventType::Renewed,
                                None,
                            ));
                            continue;
                        }
                        Err(e) => {
                            ctx.send_monitoring_event(ProcessingEvent::iterator(
                                ctx.shard_id(),
                                IteratorEventType::Failed,
                                Some(e.to_string()),
                            ));
                            e.to_string()
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        shard_id = %ctx.config.shard_id,
                        error = %e,
                        attempt = attempt,
                        "Error calling GetRecords, retrying with same iterator"
                    );
                    e.to_string()
                }
            };

            let delay = ctx.backoff.next_delay(attempt);
            ctx.send_monitoring_event(ProcessingEvent::fetch_retry(
                ctx.shard_id(),
                attempt,
                error,
                delay,
            ));

            if let Some(reason) = shutdown.sleep(delay).await {
                info!(
                    shard_id = %ctx.config.shard_id,
                    reason = %reason,
                    "Shutdown requested while waiting to retry fetch"
                );
                return None;
            }
        }
    }

    fn observe_lag(ctx: &ProcessingContext<C, F, S>, batch: &RecordBatch) {
        ctx.send_monitoring_event(ProcessingEvent::batch_fetched(
            ctx.shard_id(),
            batch.records.len(),
            batch.millis_behind_latest,
        ));

        if let (Some(behind), Some(threshold)) =
            (batch.millis_behind_latest, ctx.config.lag_warning_threshold)
        {
            if behind > 0 && (behind as u128) > threshold.as_millis() {
                warn!(
                    shard_id = %ctx.config.shard_id,
                    millis_behind_latest = behind,
                    threshold_ms = threshold.as_millis() as u64,
                    "Consumer is falling behind the shard tip"
                );
            }
        }
    }

    /// Processes a batch strictly in order, one record at a time
    async fn process_records(
        ctx: &ProcessingContext<C, F, S>,
        records: &[StreamRecord],
        resume: &mut StartingPosition,
    ) {
        for record in records {
            let disposition = Self::process_record(ctx, record).await;
            trace!(
                sequence = %record.sequence_number(),
                disposition = ?disposition,
                "Record processed"
            );
            *resume = StartingPosition::after(record.sequence_number());
        }
    }

    /// Decodes, routes, and then forwards or checkpoints a single record
    async fn process_record(
        ctx: &ProcessingContext<C, F, S>,
        record: &StreamRecord,
    ) -> RecordDisposition {
        let sequence = record.sequence_number();

        let message = match decode_message(record.data()) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    shard_id = %ctx.config.shard_id,
                    sequence = %sequence,
                    error = %e,
                    "Could not decode record data"
                );
                ctx.send_monitoring_event(ProcessingEvent::record_undecodable(
                    ctx.shard_id(),
                    sequence.to_string(),
                    e.to_string(),
                ));
                return RecordDisposition::Undecodable;
            }
        };

        match ctx.rules.find_destination(&message) {
            Some(url) => {
                let outcome = ctx.forwarder.deliver(url, sequence, record.data()).await;
                ctx.send_monitoring_event(ProcessingEvent::record_forwarded(
                    ctx.shard_id(),
                    sequence.to_string(),
                    url.to_string(),
                    outcome.clone(),
                ));
                RecordDisposition::Forwarded(outcome)
            }
            None => {
                let checkpointed = Self::checkpoint_record(ctx, sequence).await;
                ctx.send_monitoring_event(ProcessingEvent::record_skipped(
                    ctx.shard_id(),
                    sequence.to_string(),
                    checkpointed,
                ));
                RecordDisposition::Skipped { checkpointed }
            }
        }
    }

    /// Saves a checkpoint for a skipped record
    ///
    /// Returns true if the checkpoint was saved. Failures are logged and the
    /// loop carries on.
    async fn checkpoint_record(ctx: &ProcessingContext<C, F, S>, sequence: &str) -> bool {
        match ctx.store.save(sequence).await {
            Ok(()) => {
                debug!(
                    shard_id = %ctx.config.shard_id,
                    sequence = %sequence,
                    "Checkpointed skipped record"
                );
                true
            }
            Err(e) => {
                warn!(
                    shard_id = %ctx.config.shard_id,
                    sequence = %sequence,
                    error = %e,
                    "Failed to checkpoint record"
                );
                false
            }
        }
    }
}

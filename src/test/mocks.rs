use crate::client::{KinesisClientError, KinesisClientTrait, RecordBatch};
use crate::cursor::StartingPosition;
use crate::forwarder::{DeliveryOutcome, Forwarder};
use crate::store::CheckpointStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::Mutex;
use tracing::debug;

/// Mock Kinesis client for testing
///
/// Responses are served in the order they were queued. Once the record queue
/// is empty the mock reports a closed shard, which ends the consumption loop.
#[derive(Debug, Default, Clone)]
pub struct MockKinesisClient {
    #[allow(clippy::type_complexity)]
    get_iterator_responses: Arc<Mutex<VecDeque<Result<String, KinesisClientError>>>>,
    get_records_responses: Arc<Mutex<VecDeque<Result<RecordBatch, KinesisClientError>>>>,
    requested_positions: Arc<Mutex<Vec<StartingPosition>>>,
    fetched_iterators: Arc<Mutex<Vec<String>>>,
}

impl MockKinesisClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mock_get_iterator(&self, response: Result<String, KinesisClientError>) {
        self.get_iterator_responses.lock().await.push_back(response);
    }

    pub async fn mock_get_records(&self, response: Result<RecordBatch, KinesisClientError>) {
        self.get_records_responses.lock().await.push_back(response);
    }

    pub async fn mock_error(&self, error: KinesisClientError) {
        self.mock_get_records(Err(error)).await;
    }

    /// Every position an iterator was requested for, in order
    pub async fn requested_positions(&self) -> Vec<StartingPosition> {
        self.requested_positions.lock().await.clone()
    }

    /// Every iterator passed to `get_records`, in order
    pub async fn fetched_iterators(&self) -> Vec<String> {
        self.fetched_iterators.lock().await.clone()
    }
}

#[async_trait]
impl KinesisClientTrait for MockKinesisClient {
    async fn get_shard_iterator(
        &self,
        _stream_name: &str,
        _shard_id: &str,
        position: &StartingPosition,
    ) -> Result<String, KinesisClientError> {
        self.requested_positions.lock().await.push(position.clone());
        self.get_iterator_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock-iterator".to_string()))
    }

    async fn get_records(
        &self,
        iterator: &str,
        _limit: i32,
    ) -> Result<RecordBatch, KinesisClientError> {
        self.fetched_iterators.lock().await.push(iterator.to_string());
        let response = self.get_records_responses.lock().await.pop_front();
        debug!(iterator = %iterator, response = ?response, "Mock get_records");
        response.unwrap_or_else(|| Ok(RecordBatch::new(vec![], None)))
    }
}

/// A payload handed to the mock forwarder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub url: String,
    pub sequence_number: String,
    pub payload: Bytes,
}

/// Mock forwarder that records deliveries instead of sending them
#[derive(Debug, Default, Clone)]
pub struct MockForwarder {
    deliveries: Arc<parking_lot::Mutex<Vec<Delivery>>>,
    outcomes: Arc<parking_lot::Mutex<VecDeque<DeliveryOutcome>>>,
}

impl MockForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome for the next delivery; unqueued deliveries succeed
    pub fn mock_outcome(&self, outcome: DeliveryOutcome) {
        self.outcomes.lock().push_back(outcome);
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }
}

#[async_trait]
impl Forwarder for MockForwarder {
    async fn deliver(&self, url: &str, sequence_number: &str, payload: &Bytes) -> DeliveryOutcome {
        self.deliveries.lock().push(Delivery {
            url: url.to_string(),
            sequence_number: sequence_number.to_string(),
            payload: payload.clone(),
        });
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or(DeliveryOutcome::Delivered { status: 200 })
    }
}

/// Mock checkpoint store with failure injection and a save history
#[derive(Debug, Default, Clone)]
pub struct MockCheckpointStore {
    checkpoint: Arc<parking_lot::Mutex<Option<String>>>,
    saved: Arc<parking_lot::Mutex<Vec<String>>>,
    fail_saves: Arc<AtomicBool>,
    fail_loads: Arc<AtomicBool>,
}

impl MockCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(sequence_number: &str) -> Self {
        let store = Self::default();
        *store.checkpoint.lock() = Some(sequence_number.to_string());
        store
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// The currently stored checkpoint
    pub fn current(&self) -> Option<String> {
        self.checkpoint.lock().clone()
    }

    /// Every successfully saved checkpoint, in order
    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl CheckpointStore for MockCheckpointStore {
    async fn load(&self) -> anyhow::Result<Option<String>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            anyhow::bail!("mock load failure");
        }
        Ok(self.current())
    }

    async fn save(&self, sequence_number: &str) -> anyhow::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("mock save failure");
        }
        *self.checkpoint.lock() = Some(sequence_number.to_string());
        self.saved.lock().push(sequence_number.to_string());
        Ok(())
    }
}

//! Stream transport abstraction over the Kinesis API
//!
//! The consumption loop only needs two calls from the transport: turn a
//! [`StartingPosition`] into a shard iterator, and fetch the next batch for an
//! iterator. [`KinesisClientTrait`] is that seam; the AWS SDK client implements
//! it and tests substitute a mock.

use async_trait::async_trait;
use aws_sdk_kinesis::error::{DisplayErrorContext, SdkError};
use aws_sdk_kinesis::operation::get_records::GetRecordsError;
use aws_sdk_kinesis::operation::get_shard_iterator::GetShardIteratorError;
use aws_sdk_kinesis::types::ShardIteratorType;
use aws_sdk_kinesis::Client;
use bytes::Bytes;
use std::time::SystemTime;
use thiserror::Error;

use crate::cursor::StartingPosition;

/// Failures reported by the stream transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KinesisClientError {
    #[error("Iterator expired")]
    ExpiredIterator,

    #[error("Provisioned throughput exceeded")]
    ThroughputExceeded,

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("{0}")]
    Other(String),
}

/// A single record read from the shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    sequence_number: String,
    data: Bytes,
}

impl StreamRecord {
    pub fn new(sequence_number: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            sequence_number: sequence_number.into(),
            data: data.into(),
        }
    }

    pub fn sequence_number(&self) -> &str {
        &self.sequence_number
    }

    /// Raw payload bytes, forwarded untouched on a match
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// One page of records plus the iterator to continue from
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub records: Vec<StreamRecord>,
    /// `None` once the shard has been closed and fully read
    pub next_iterator: Option<String>,
    pub millis_behind_latest: Option<i64>,
}

impl RecordBatch {
    pub fn new(records: Vec<StreamRecord>, next_iterator: Option<String>) -> Self {
        Self {
            records,
            next_iterator,
            millis_behind_latest: None,
        }
    }

    pub fn with_millis_behind_latest(mut self, millis: i64) -> Self {
        self.millis_behind_latest = Some(millis);
        self
    }
}

#[async_trait]
pub trait KinesisClientTrait: Send + Sync {
    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        position: &StartingPosition,
    ) -> Result<String, KinesisClientError>;

    async fn get_records(
        &self,
        iterator: &str,
        limit: i32,
    ) -> Result<RecordBatch, KinesisClientError>;
}

#[async_trait]
impl KinesisClientTrait for Client {
    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        position: &StartingPosition,
    ) -> Result<String, KinesisClientError> {
        let mut req = self
            .get_shard_iterator()
            .stream_name(stream_name)
            .shard_id(shard_id);

        req = match position {
            StartingPosition::AtTimestamp(ts) => {
                let system_time: SystemTime = (*ts).into();
                req.shard_iterator_type(ShardIteratorType::AtTimestamp)
                    .timestamp(aws_smithy_types::DateTime::from(system_time))
            }
            StartingPosition::AfterSequenceNumber(seq) => req
                .shard_iterator_type(ShardIteratorType::AfterSequenceNumber)
                .starting_sequence_number(seq),
        };

        let response = req.send().await.map_err(classify_get_shard_iterator)?;
        response
            .shard_iterator()
            .map(String::from)
            .ok_or_else(|| KinesisClientError::Other("No shard iterator returned".to_string()))
    }

    async fn get_records(
        &self,
        iterator: &str,
        limit: i32,
    ) -> Result<RecordBatch, KinesisClientError> {
        let response = self
            .get_records()
            .shard_iterator(iterator)
            .limit(limit)
            .send()
            .await
            .map_err(classify_get_records)?;

        let records = response
            .records()
            .iter()
            .map(|r| StreamRecord::new(r.sequence_number(), r.data().as_ref().to_vec()))
            .collect();

        Ok(RecordBatch {
            records,
            next_iterator: response.next_shard_iterator().map(String::from),
            millis_behind_latest: response.millis_behind_latest(),
        })
    }
}

fn classify_get_records(err: SdkError<GetRecordsError>) -> KinesisClientError {
    match err.as_service_error() {
        Some(GetRecordsError::ExpiredIteratorException(_)) => KinesisClientError::ExpiredIterator,
        Some(GetRecordsError::ProvisionedThroughputExceededException(_)) => {
            KinesisClientError::ThroughputExceeded
        }
        Some(GetRecordsError::ResourceNotFoundException(e)) => {
            KinesisClientError::ResourceNotFound(e.to_string())
        }
        _ => KinesisClientError::Other(DisplayErrorContext(&err).to_string()),
    }
}

fn classify_get_shard_iterator(err: SdkError<GetShardIteratorError>) -> KinesisClientError {
    match err.as_service_error() {
        Some(GetShardIteratorError::ProvisionedThroughputExceededException(_)) => {
            KinesisClientError::ThroughputExceeded
        }
        Some(GetShardIteratorError::ResourceNotFoundException(e)) => {
            KinesisClientError::ResourceNotFound(e.to_string())
        }
        _ => KinesisClientError::Other(DisplayErrorContext(&err).to_string()),
    }
}

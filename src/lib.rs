//! Kinesis Forwarder - routes records from a single Kinesis shard to HTTP endpoints
//!
//! Each record is decoded as a JSON object and checked against an ordered set
//! of key/value rules. Matching records are posted to the rule's URL; records
//! that match nothing are checkpointed so a restart resumes after them.

pub mod client;
pub mod config;
pub mod cursor;
pub mod error;
pub mod forwarder;
pub mod monitoring;
pub mod processor;
pub mod retry;
pub mod rules;
pub mod shutdown;
pub mod store;

// Make test utilities available for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test;

#[cfg(test)]
mod tests;

pub use error::{ProcessorError, Result};
pub use processor::{ForwardingProcessor, ProcessorConfig};
pub use retry::{Backoff, FixedBackoff, RetryConfig};

// Re-export main traits
pub use crate::client::KinesisClientTrait;
pub use crate::forwarder::Forwarder;
pub use crate::store::CheckpointStore;

// Re-export implementations
pub use crate::client::{KinesisClientError, RecordBatch, StreamRecord};
pub use crate::cursor::StartingPosition;
pub use crate::forwarder::{DeliveryOutcome, HttpForwarder};
pub use crate::rules::{Rule, RuleSet};
pub use crate::shutdown::{ShutdownCoordinator, ShutdownReason, ShutdownSignal};
pub use crate::store::FileCheckpointStore;

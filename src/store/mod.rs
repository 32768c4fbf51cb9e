//! Checkpoint storage for the Kinesis forwarder
//!
//! The checkpoint is the sequence number of the last record that matched no
//! rule. Records that were forwarded are never checkpointed.

use async_trait::async_trait;

pub mod file;

/// Trait for checkpoint storage implementations
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Retrieve the stored checkpoint, `None` if nothing was ever saved
    async fn load(&self) -> anyhow::Result<Option<String>>;

    /// Replace the stored checkpoint
    async fn save(&self, sequence_number: &str) -> anyhow::Result<()>;
}

pub use file::{FileCheckpointStore, DEFAULT_CHECKPOINT_PATH};

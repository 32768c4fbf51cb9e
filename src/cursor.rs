//! Cursor acquisition and renewal for the consumed shard

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::client::{KinesisClientTrait, RecordBatch};
use crate::error::{ProcessorError, Result};

/// Where a cursor should start reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartingPosition {
    /// Records arriving at or after the given instant
    AtTimestamp(DateTime<Utc>),
    /// The record immediately following the given sequence number
    AfterSequenceNumber(String),
}

impl StartingPosition {
    /// Anchors a cursor at the current wall-clock time
    pub fn now() -> Self {
        StartingPosition::AtTimestamp(Utc::now())
    }

    pub fn after(sequence_number: impl Into<String>) -> Self {
        StartingPosition::AfterSequenceNumber(sequence_number.into())
    }

    /// Resume after the checkpoint if there is one, otherwise start from now
    pub fn from_checkpoint(checkpoint: Option<String>) -> Self {
        match checkpoint {
            Some(seq) => Self::after(seq),
            None => Self::now(),
        }
    }
}

impl fmt::Display for StartingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartingPosition::AtTimestamp(ts) => write!(f, "at timestamp {}", ts.to_rfc3339()),
            StartingPosition::AfterSequenceNumber(seq) => write!(f, "after sequence {}", seq),
        }
    }
}

/// Opaque token telling the transport where to read next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What to do after a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorAdvance {
    Next(Cursor),
    /// The shard is closed; there will be no further records
    Closed,
}

/// Converts starting positions into cursors for one shard
pub struct CursorManager<C> {
    client: Arc<C>,
    stream_name: String,
    shard_id: String,
}

impl<C> CursorManager<C>
where
    C: KinesisClientTrait + 'static,
{
    pub fn new(client: Arc<C>, stream_name: impl Into<String>, shard_id: impl Into<String>) -> Self {
        Self {
            client,
            stream_name: stream_name.into(),
            shard_id: shard_id.into(),
        }
    }

    /// Requests a cursor anchored at `position`
    ///
    /// Transport failures are returned unchanged; at startup they are fatal.
    pub async fn acquire(&self, position: &StartingPosition) -> Result<Cursor> {
        match self
            .client
            .get_shard_iterator(&self.stream_name, &self.shard_id, position)
            .await
        {
            Ok(token) => {
                debug!(
                    shard_id = %self.shard_id,
                    position = %position,
                    "Acquired shard iterator"
                );
                Ok(Cursor::new(token))
            }
            Err(e) => {
                error!(
                    shard_id = %self.shard_id,
                    position = %position,
                    error = %e,
                    "Failed to get shard iterator"
                );
                Err(ProcessorError::GetIteratorFailed(e.to_string()))
            }
        }
    }

    /// Decides which cursor follows a fetched batch
    pub fn advance(&self, batch: &RecordBatch) -> CursorAdvance {
        match &batch.next_iterator {
            Some(next) => CursorAdvance::Next(Cursor::new(next.clone())),
            None => CursorAdvance::Closed,
        }
    }

    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }
}

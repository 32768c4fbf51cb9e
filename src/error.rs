//! Error types for the Kinesis forwarder

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for processor operations
///
/// Only startup failures surface through this type; once the consumption loop
/// is running every failure is logged and the loop carries on.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Failed to get iterator: {0}")]
    GetIteratorFailed(String),

    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    #[error("Rule error: {0}")]
    RuleError(#[from] RuleError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<CheckpointError> for ProcessorError {
    fn from(err: CheckpointError) -> Self {
        ProcessorError::CheckpointError(err.to_string())
    }
}

/// Result type for processor operations
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Error type for checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to save checkpoint to {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to retrieve checkpoint from {path}: {source}")]
    RetrieveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error type for loading the routing rule file
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("could not read rule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse rules: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error type for decoding a record payload into a message
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

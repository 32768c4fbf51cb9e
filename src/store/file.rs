use crate::error::CheckpointError;
use crate::store::CheckpointStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, trace, warn};

/// Default location of the checkpoint file, relative to the working directory
pub const DEFAULT_CHECKPOINT_PATH: &str = "current_sequence_number";

/// Keeps the last skipped sequence number as plain text in a single file
///
/// Saves go through a sibling `.tmp` file that is renamed into place, so a
/// crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(path = %path.display(), "Initializing file checkpoint store");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl Default for FileCheckpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_PATH)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    #[instrument(skip(self))]
    async fn load(&self) -> anyhow::Result<Option<String>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!("No checkpoint file present");
                return Ok(None);
            }
            Err(source) => {
                return Err(CheckpointError::RetrieveFailed {
                    path: self.path.clone(),
                    source,
                }
                .into())
            }
        };

        let sequence = contents.trim();
        if sequence.is_empty() {
            warn!("Checkpoint file is empty, treating as no checkpoint");
            return Ok(None);
        }

        debug!(checkpoint = %sequence, "Read checkpoint from file");
        Ok(Some(sequence.to_string()))
    }

    #[instrument(skip(self))]
    async fn save(&self, sequence_number: &str) -> anyhow::Result<()> {
        let tmp = self.tmp_path();

        tokio::fs::write(&tmp, sequence_number)
            .await
            .map_err(|source| CheckpointError::SaveFailed {
                path: tmp.clone(),
                source,
            })?;

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| CheckpointError::SaveFailed {
                path: self.path.clone(),
                source,
            })?;

        trace!(sequence_number = %sequence_number, "Checkpoint written");
        Ok(())
    }
}

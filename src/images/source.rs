use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::pool::{ProductionError, WorkSource};

/// Produces `<save_dir>/<token>.<extension>` paths, `limit` of them.
///
/// Tokens are UUIDv7, so paths are unique across items and across runs and
/// sort in creation order. The save directory is checked when the first
/// path is requested.
#[derive(Debug)]
pub struct SavePathSource {
    save_dir: PathBuf,
    extension: String,
    limit: u64,
    produced: u64,
}

impl SavePathSource {
    pub fn new(save_dir: impl Into<PathBuf>, extension: impl Into<String>, limit: u64) -> Self {
        Self {
            save_dir: save_dir.into(),
            extension: extension.into(),
            limit,
            produced: 0,
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }

    async fn check_save_dir(&self) -> Result<(), ProductionError> {
        let metadata = tokio::fs::metadata(&self.save_dir).await.map_err(|e| {
            ProductionError::Failed(format!(
                "save directory {} is not accessible: {}",
                self.save_dir.display(),
                e
            ))
        })?;

        if !metadata.is_dir() {
            return Err(ProductionError::Failed(format!(
                "save path {} is not a directory",
                self.save_dir.display()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl WorkSource for SavePathSource {
    type Item = PathBuf;

    async fn next_item(&mut self) -> Result<Option<PathBuf>, ProductionError> {
        if self.produced >= self.limit {
            return Ok(None);
        }

        if self.produced == 0 {
            self.check_save_dir().await?;
        }

        let path = self
            .save_dir
            .join(format!("{}.{}", Uuid::now_v7(), self.extension));
        self.produced += 1;

        debug!(path = %path.display(), produced = self.produced, "Save path produced");
        Ok(Some(path))
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.limit)
    }
}

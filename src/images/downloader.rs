use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::http::HttpClient;
use crate::pool::{ConsumptionError, WorkConsumer};

/// Downloads one image per save path.
///
/// Every call fetches `source_url` and writes the raw body to the given
/// path, replacing any existing file. The body is written to a hidden
/// `.part` sibling first and renamed into place, so an aborted item never
/// leaves a file at its final path. A hard stop that lands mid-write can
/// leave the `.part` file behind.
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: HttpClient,
    source_url: Arc<str>,
}

impl ImageDownloader {
    pub fn new(client: HttpClient, source_url: impl Into<Arc<str>>) -> Self {
        Self {
            client,
            source_url: source_url.into(),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

#[async_trait]
impl WorkConsumer<PathBuf> for ImageDownloader {
    async fn consume(&self, path: PathBuf) -> Result<(), ConsumptionError> {
        let bytes = self.client.download(&self.source_url).await?;

        let partial = partial_path(&path);
        if let Err(e) = tokio::fs::write(&partial, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        tokio::fs::rename(&partial, &path).await?;

        info!(path = %path.display(), size = bytes.len(), "Image saved");
        Ok(())
    }
}

/// `<dir>/.<name>.part` next to the final path
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".part");
    path.with_file_name(name)
}

use std::path::PathBuf;

use super::downloader::ImageDownloader;
use super::http::{HttpClient, HttpConfig, Result};
use super::source::SavePathSource;
use crate::config::Config;
use crate::pool::WorkFactory;

/// Work factory for bulk image downloads
#[derive(Debug, Clone)]
pub struct ImageDownloaderFactory {
    maximum_images: u64,
    save_path: PathBuf,
    file_extension: String,
    downloader: ImageDownloader,
}

impl ImageDownloaderFactory {
    pub fn new(
        maximum_images: u64,
        save_path: impl Into<PathBuf>,
        source_url: impl Into<String>,
        http: HttpConfig,
    ) -> Result<Self> {
        let client = HttpClient::new(http)?;

        Ok(Self {
            maximum_images,
            save_path: save_path.into(),
            file_extension: "jpg".to_string(),
            downloader: ImageDownloader::new(client, source_url.into()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let factory = Self::new(
            config.images.maximum_images,
            config.images.save_path.clone(),
            config.images.source_url.clone(),
            HttpConfig::from(&config.http),
        )?;

        Ok(factory.with_file_extension(config.images.file_extension.clone()))
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    pub fn maximum_images(&self) -> u64 {
        self.maximum_images
    }

    pub fn save_path(&self) -> &PathBuf {
        &self.save_path
    }
}

impl WorkFactory for ImageDownloaderFactory {
    type Item = PathBuf;
    type Source = SavePathSource;
    type Consumer = ImageDownloader;

    fn create_source(&self) -> SavePathSource {
        SavePathSource::new(
            self.save_path.clone(),
            self.file_extension.clone(),
            self.maximum_images,
        )
    }

    fn create_consumer(&self) -> ImageDownloader {
        self.downloader.clone()
    }
}

//! Bulk image downloader built on the worker pool
//!
//! [`ImageDownloaderFactory`] produces a lazy sequence of unique save paths
//! (`<save_path>/<uuid>.jpg`) and an [`ImageDownloader`] that fetches one
//! image from the configured URL for each path.

mod downloader;
mod factory;
pub mod http;
mod source;

pub use downloader::ImageDownloader;
pub use factory::ImageDownloaderFactory;
pub use http::{DownloadError, HttpClient, HttpConfig};
pub use source::SavePathSource;

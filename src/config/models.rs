use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::PoolConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub images: ImageSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

/// Worker pool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolSettings {
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Per-item timeout; unset means a hanging download blocks its worker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_timeout_secs: Option<u64>,
    /// Stop dispatching after this many failures (unset = best effort)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u64>,
    #[serde(default = "default_max_failure_records")]
    pub max_failure_records: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            item_timeout_secs: None,
            failure_threshold: None,
            max_failure_records: default_max_failure_records(),
        }
    }
}

impl From<&PoolSettings> for PoolConfig {
    fn from(settings: &PoolSettings) -> Self {
        PoolConfig {
            pool_size: settings.pool_size,
            item_timeout: settings.item_timeout_secs.map(Duration::from_secs),
            failure_threshold: settings.failure_threshold,
            max_failure_records: settings.max_failure_records,
        }
    }
}

fn default_pool_size() -> usize {
    4
}

fn default_max_failure_records() -> usize {
    100
}

/// Image download job settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageSettings {
    #[serde(default = "default_maximum_images")]
    pub maximum_images: u64,
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            maximum_images: default_maximum_images(),
            save_path: default_save_path(),
            source_url: default_source_url(),
            file_extension: default_file_extension(),
        }
    }
}

fn default_maximum_images() -> u64 {
    10
}

fn default_save_path() -> PathBuf {
    PathBuf::from("images")
}

fn default_source_url() -> String {
    "https://picsum.photos/800/600/?blur=2".to_string()
}

fn default_file_extension() -> String {
    "jpg".to_string()
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Attempts per image, including the first (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            user_agent: default_user_agent(),
            accept_invalid_certs: false,
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    1
}

fn default_user_agent() -> String {
    concat!("fetchpool/", env!("CARGO_PKG_VERSION")).to_string()
}

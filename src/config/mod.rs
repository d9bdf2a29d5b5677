//! Configuration management for fetchpool
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use fetchpool::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Pool size: {}", config.pool.pool_size);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `FETCHPOOL__<section>__<key>`:
//! - `FETCHPOOL__POOL__POOL_SIZE=16`
//! - `FETCHPOOL__IMAGES__SAVE_PATH=/data/images`
//! - `FETCHPOOL__HTTP__MAX_ATTEMPTS=3`
//!
//! # Configuration File
//!
//! Read from `config/fetchpool.toml` unless `FETCHPOOL_CONFIG` points
//! elsewhere. A missing file is not an error.

mod models;
mod sources;
mod validation;

pub use models::{Config, HttpSettings, ImageSettings, PoolSettings};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated_from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without validating, for callers that apply overrides first and
    /// call [`validate`](Self::validate) afterwards
    pub fn load_unvalidated() -> Result<Self, ConfigError> {
        Ok(sources::load()?)
    }

    /// Path variant of [`load_unvalidated`](Self::load_unvalidated)
    pub fn load_unvalidated_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        Ok(sources::load_from_sources(path)?)
    }

    /// Re-check the configuration, e.g. after applying CLI overrides
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("pool_size must be at least 1")]
    InvalidPoolSize,

    #[error("{field} must be positive")]
    ZeroValue { field: &'static str },

    #[error("Invalid source URL '{url}': {reason}")]
    InvalidSourceUrl { url: String, reason: String },

    #[error("file_extension must not be empty or contain path separators: '{0}'")]
    InvalidFileExtension(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_pool(config)?;
    validate_images(config)?;
    validate_http(config)?;
    Ok(())
}

fn validate_pool(config: &Config) -> Result<(), ValidationError> {
    if config.pool.pool_size == 0 {
        return Err(ValidationError::InvalidPoolSize);
    }

    if config.pool.item_timeout_secs == Some(0) {
        return Err(ValidationError::ZeroValue {
            field: "item_timeout_secs",
        });
    }

    if config.pool.failure_threshold == Some(0) {
        return Err(ValidationError::ZeroValue {
            field: "failure_threshold",
        });
    }

    Ok(())
}

/// Source URL must be absolute http(s); extension must be a bare suffix
fn validate_images(config: &Config) -> Result<(), ValidationError> {
    let url = &config.images.source_url;
    let parsed = reqwest::Url::parse(url).map_err(|e| ValidationError::InvalidSourceUrl {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidSourceUrl {
            url: url.clone(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    let extension = &config.images.file_extension;
    if extension.is_empty() || extension.contains(['/', '\\']) {
        return Err(ValidationError::InvalidFileExtension(extension.clone()));
    }

    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    if config.http.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroValue {
            field: "connect_timeout_secs",
        });
    }

    if config.http.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroValue {
            field: "request_timeout_secs",
        });
    }

    if config.http.max_attempts == 0 {
        return Err(ValidationError::ZeroValue {
            field: "max_attempts",
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_pool_size() {
        let mut config = Config::default();
        config.pool.pool_size = 0;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidPoolSize)));
    }

    #[test]
    fn test_zero_item_timeout() {
        let mut config = Config::default();
        config.pool.item_timeout_secs = Some(0);

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::ZeroValue {
                field: "item_timeout_secs"
            })
        ));
    }

    #[test]
    fn test_zero_images_is_allowed() {
        let mut config = Config::default();
        config.images.maximum_images = 0;

        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_source_url() {
        let mut config = Config::default();
        config.images.source_url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidSourceUrl { .. })
        ));

        config.images.source_url = "ftp://example.com/image.jpg".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidSourceUrl { .. })
        ));
    }

    #[test]
    fn test_invalid_file_extension() {
        let mut config = Config::default();
        config.images.file_extension = "../jpg".to_string();

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidFileExtension(_))
        ));
    }

    #[test]
    fn test_zero_max_attempts() {
        let mut config = Config::default();
        config.http.max_attempts = 0;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::ZeroValue {
                field: "max_attempts"
            })
        ));
    }
}

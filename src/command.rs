use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::cli::{ConfigArgs, DownloadArgs};
use fetchpool::config::Config;
use fetchpool::images::ImageDownloaderFactory;
use fetchpool::pool::{Dispatcher, PoolCanceller, PoolConfig};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Flags may still replace bad values, so validation happens after overrides
fn load_config(path: Option<PathBuf>) -> Result<Config, AnyError> {
    let config = match path {
        Some(path) => Config::load_unvalidated_from_path(path)?,
        None => Config::load_unvalidated()?,
    };
    Ok(config)
}

fn apply_overrides(config: &mut Config, args: &DownloadArgs) {
    if let Some(max_images) = args.max_images {
        config.images.maximum_images = max_images;
    }
    if let Some(save_path) = &args.save_path {
        config.images.save_path = save_path.clone();
    }
    if let Some(pool_size) = args.pool_size {
        config.pool.pool_size = pool_size;
    }
    if let Some(url) = &args.url {
        config.images.source_url = url.clone();
    }
    if let Some(timeout) = args.item_timeout_secs {
        config.pool.item_timeout_secs = Some(timeout);
    }
}

pub async fn download(args: DownloadArgs) -> Result<(), AnyError> {
    let mut config = load_config(args.config.clone())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    tokio::fs::create_dir_all(&config.images.save_path).await?;

    let factory = ImageDownloaderFactory::from_config(&config)?;
    let dispatcher = Dispatcher::new(PoolConfig::from(&config.pool));

    info!(
        maximum_images = config.images.maximum_images,
        save_path = %config.images.save_path.display(),
        pool_size = config.pool.pool_size,
        url = %config.images.source_url,
        "Starting download"
    );

    let handle = dispatcher.start_factory(&factory)?;
    let signals = tokio::spawn(watch_signals(handle.canceller()));

    let result = handle.join().await;
    signals.abort();
    let summary = result?;

    if let Some(report) = &args.report {
        let json = serde_json::to_string_pretty(&summary)?;
        tokio::fs::write(report, json).await?;
        info!(path = %report.display(), "Run report written");
    }

    for failure in &summary.failures {
        warn!(item = %failure.item, reason = %failure.reason, "Download failed");
    }
    println!("{}", summary);

    Ok(())
}

pub fn show_config(args: ConfigArgs) -> Result<(), AnyError> {
    let config = load_config(args.config)?;
    config.validate()?;
    print!("{}", config.to_toml()?);
    Ok(())
}

/// First signal drains in-flight downloads, a second abandons them
async fn watch_signals(canceller: PoolCanceller) {
    shutdown_signal().await;
    warn!("Shutdown signal received, finishing in-flight downloads (signal again to abort)");
    canceller.cancel();

    shutdown_signal().await;
    warn!("Second shutdown signal received, abandoning in-flight downloads");
    canceller.hard_stop();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn download_args(config: Option<PathBuf>) -> DownloadArgs {
        DownloadArgs {
            config,
            max_images: None,
            save_path: None,
            pool_size: None,
            url: None,
            item_timeout_secs: None,
            report: None,
        }
    }

    #[test]
    fn test_flag_replaces_invalid_file_value() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        std::fs::write(&config_path, "[pool]\npool_size = 0\n").unwrap();

        let args = DownloadArgs {
            pool_size: Some(2),
            ..download_args(Some(config_path))
        };

        let mut config = load_config(args.config.clone()).unwrap();
        apply_overrides(&mut config, &args);

        assert!(config.validate().is_ok());
        assert_eq!(config.pool.pool_size, 2);
    }

    #[test]
    fn test_invalid_file_value_without_flag_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        std::fs::write(&config_path, "[pool]\npool_size = 0\n").unwrap();

        let args = download_args(Some(config_path));
        let mut config = load_config(args.config.clone()).unwrap();
        apply_overrides(&mut config, &args);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        let args = DownloadArgs {
            config: None,
            max_images: Some(3),
            save_path: Some(PathBuf::from("/tmp/out")),
            pool_size: Some(2),
            url: None,
            item_timeout_secs: Some(5),
            report: None,
        };

        apply_overrides(&mut config, &args);

        assert_eq!(config.images.maximum_images, 3);
        assert_eq!(config.images.save_path, PathBuf::from("/tmp/out"));
        assert_eq!(config.pool.pool_size, 2);
        assert_eq!(config.pool.item_timeout_secs, Some(5));
        assert_eq!(config.images.source_url, "https://picsum.photos/800/600/?blur=2");
    }
}

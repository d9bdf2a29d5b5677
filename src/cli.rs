use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fetchpool")]
#[command(about = "Concurrent bulk image downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download images with a pool of concurrent workers
    Download(DownloadArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Configuration file (defaults to $FETCHPOOL_CONFIG or config/fetchpool.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of images to download
    #[arg(long)]
    pub max_images: Option<u64>,

    /// Directory to save images into (created if missing)
    #[arg(long)]
    pub save_path: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// URL to fetch each image from
    #[arg(long)]
    pub url: Option<String>,

    /// Per-image timeout in seconds
    #[arg(long)]
    pub item_timeout_secs: Option<u64>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (defaults to $FETCHPOOL_CONFIG or config/fetchpool.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

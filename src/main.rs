mod cli;
mod command;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    fetchpool::observability::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download(args) => command::download(args).await?,
        Commands::Config(args) => command::show_config(args)?,
    }

    Ok(())
}

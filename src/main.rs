//! Series Manager CLI
//!
//! Provides commands for:
//! - `sync`: Reconcile the local series with the provider and backfill gaps
//! - `status`: Show local coverage and detected gaps
//! - `fetch`: Bulk fetch a named historical range
//! - `quote`: Show the latest quote
//! - `symbols`: Fetch or show the cached region symbol list

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use series_manager::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("series_manager=info".parse()?))
        .init();

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    match cli.command {
        Commands::Sync(args) => {
            series_manager::cli::sync::execute(args).await?;
        }
        Commands::Status(args) => {
            series_manager::cli::status::execute(args)?;
        }
        Commands::Fetch(args) => {
            series_manager::cli::fetch::execute(args).await?;
        }
        Commands::Quote(args) => {
            series_manager::cli::quote::execute(args).await?;
        }
        Commands::Symbols(args) => {
            series_manager::cli::symbols::execute(args).await?;
        }
    }

    Ok(())
}

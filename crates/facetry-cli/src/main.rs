//! Facetry CLI
//!
//! Command-line interface for checking and querying Facetry catalogs.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use facetry_cli::{Cli, handle_command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(config = %cli.config.display(), "Starting facetry");

    if let Err(e) = handle_command(cli).await {
        tracing::error!("{e}");
        return Err(e.into());
    }
    Ok(())
}

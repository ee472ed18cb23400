//! Main entry point for the jolpica CLI

use clap::Parser;
use jolpica_f1_client::cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
///
/// Logs go to stderr; stdout carries the JSON response only.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jolpica_f1_client=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: anyhow::Result<()> = match &cli.command {
        Commands::Cache(cache_cmd) => cache_cmd.execute(&cli).map_err(anyhow::Error::from),
        command => match command.resource() {
            Some((resource, args)) => args
                .execute(&cli, resource)
                .await
                .map_err(anyhow::Error::from),
            None => Ok(()),
        },
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}

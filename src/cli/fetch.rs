//! Top-level CLI definition and the resource fetch commands

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use super::CliError;
use crate::client::config::DEFAULT_BASE_URL;
use crate::client::{validate_season, ClientConfig, JolpicaClient, LapsProgress, Resource};

/// Parse and validate the cache TTL (hours, must be positive and finite)
fn parse_ttl_hours(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of hours"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err("cache TTL must be a positive number of hours".to_string());
    }
    Ok(value)
}

/// Jolpica-F1 CLI
#[derive(Parser, Debug)]
#[command(name = "jolpica")]
#[command(about = "Fetch Formula 1 statistics from the Jolpica-F1 API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL
    #[arg(long, global = true, env = "JOLPICA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Persist responses in this directory (default: in-memory cache)
    #[arg(long, global = true, env = "JOLPICA_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Hours before a cached response is refetched (default: never)
    #[arg(long, global = true, env = "JOLPICA_CACHE_TTL_HOURS", value_parser = parse_ttl_hours)]
    pub cache_ttl_hours: Option<f64>,

    /// Maximum attempts per request (default: 5, range: 1-20)
    #[arg(long, global = true, env = "JOLPICA_MAX_RETRIES", default_value = "5", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Fail on HTTP 429 instead of waiting for Retry-After
    #[arg(long, global = true, env = "JOLPICA_FAIL_FAST", default_value_t = false)]
    pub fail_fast: bool,

    /// Print compact JSON instead of pretty-printed
    #[arg(long, global = true, default_value_t = false)]
    pub compact: bool,
}

impl Cli {
    /// Client configuration from the global flags
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            max_retries: self.max_retries,
            wait_on_rate_limit: !self.fail_fast,
            cache_dir: self.cache_dir.clone(),
            cache_ttl_hours: self.cache_ttl_hours,
            ..ClientConfig::default()
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Qualifying classification for a race
    Qualifying(RaceArgs),

    /// Race classification
    Results(RaceArgs),

    /// Every lap of a race with per-driver timings
    Laps(RaceArgs),

    /// Drivers' championship standings (round 0: whole season)
    DriverStandings(RaceArgs),

    /// Constructors' championship standings (round 0: whole season)
    ConstructorStandings(RaceArgs),

    /// Pit stops for a race
    Pitstops(RaceArgs),

    /// Race schedule (round 0: whole season)
    Races(RaceArgs),

    /// Manage the response cache
    Cache(super::CacheCommand),
}

impl Commands {
    /// Resource and arguments for the fetch commands
    pub fn resource(&self) -> Option<(Resource, &RaceArgs)> {
        match self {
            Commands::Qualifying(args) => Some((Resource::Qualifying, args)),
            Commands::Results(args) => Some((Resource::Results, args)),
            Commands::Laps(args) => Some((Resource::Laps, args)),
            Commands::DriverStandings(args) => Some((Resource::DriverStandings, args)),
            Commands::ConstructorStandings(args) => Some((Resource::ConstructorStandings, args)),
            Commands::Pitstops(args) => Some((Resource::PitStops, args)),
            Commands::Races(args) => Some((Resource::Races, args)),
            Commands::Cache(_) => None,
        }
    }
}

/// Season and round selection
#[derive(Args, Debug, Clone)]
pub struct RaceArgs {
    /// Season year, or "current"
    #[arg(long, default_value = "current")]
    pub season: String,

    /// Round number within the season
    #[arg(long, default_value_t = 0)]
    pub round: u32,
}

impl RaceArgs {
    /// Validate the season argument
    pub fn validate(&self) -> Result<(), CliError> {
        validate_season(&self.season).map_err(|e| CliError::InvalidArgument(e.to_string()))
    }

    /// Fetch `resource` and print the envelope to stdout
    pub async fn execute(&self, cli: &Cli, resource: Resource) -> Result<(), CliError> {
        self.validate()?;

        let client = JolpicaClient::new(cli.client_config())?;
        info!(
            resource = %resource,
            season = %self.season,
            round = self.round,
            "Fetching"
        );

        let envelope = if resource == Resource::Laps {
            self.fetch_laps(&client).await?
        } else {
            client
                .fetch_resource(resource, &self.season, self.round)
                .await?
        };

        write_json(&mut std::io::stdout().lock(), &envelope, cli.compact)
    }

    async fn fetch_laps(&self, client: &JolpicaClient) -> Result<Value, CliError> {
        let pb = create_progress_bar(&format!("Laps {} round {}", self.season, self.round));
        let mut on_page = |progress: LapsProgress| {
            pb.set_length(progress.total_pages);
            pb.set_position(progress.page);
        };

        let result = client
            .laps_paginator()
            .fetch_laps_with_progress(&self.season, self.round, &mut on_page)
            .await;
        pb.finish_and_clear();
        Ok(result?)
    }
}

/// Serialize an envelope to `out`
pub fn write_json(out: &mut impl Write, value: &Value, compact: bool) -> Result<(), CliError> {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .map_err(|e| CliError::OutputError(format!("Failed to serialize response: {e}")))?;

    writeln!(out, "{rendered}")
        .map_err(|e| CliError::OutputError(format!("Failed to write output: {e}")))
}

/// Page progress bar, drawn on stderr
fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

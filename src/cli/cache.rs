//! CLI command for managing the on-disk response cache

use clap::Args;
use serde_json::json;
use std::path::Path;
use tracing::info;

use super::fetch::write_json;
use super::{Cli, CliError};
use crate::cache::CacheStore;

/// Cache subcommand
#[derive(Debug, Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    action: CacheAction,
}

/// Cache actions
#[derive(Debug, clap::Subcommand)]
enum CacheAction {
    /// Remove every cached response
    Clear,

    /// Remove responses older than --cache-ttl-hours
    Evict,

    /// Show the cache location and entry count
    Info,
}

impl CacheCommand {
    /// Execute the cache command against `--cache-dir`
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let dir = cli.cache_dir.as_deref().ok_or_else(|| {
            CliError::InvalidArgument(
                "cache commands need --cache-dir (or JOLPICA_CACHE_DIR)".to_string(),
            )
        })?;
        let config = cli.client_config();
        let store = CacheStore::disk(dir, config.cache_ttl())?;

        let report = match self.action {
            CacheAction::Clear => {
                let removed = store.clear()?;
                info!(removed, dir = %dir.display(), "Cache cleared");
                json!({ "cache_dir": display(dir), "removed": removed })
            }
            CacheAction::Evict => {
                if config.cache_ttl().is_none() {
                    return Err(CliError::InvalidArgument(
                        "evict needs --cache-ttl-hours".to_string(),
                    ));
                }
                let removed = store.evict_expired()?;
                info!(removed, dir = %dir.display(), "Expired cache entries evicted");
                json!({ "cache_dir": display(dir), "removed": removed })
            }
            CacheAction::Info => json!({
                "cache_dir": display(dir),
                "entries": store.len(),
                "ttl_hours": config.cache_ttl_hours,
            }),
        };

        write_json(&mut std::io::stdout().lock(), &report, cli.compact)
    }
}

fn display(dir: &Path) -> String {
    dir.display().to_string()
}

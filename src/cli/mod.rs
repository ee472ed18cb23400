//! CLI command implementations

pub mod cache;
pub mod error;
pub mod fetch;

pub use cache::CacheCommand;
pub use error::CliError;
pub use fetch::{Cli, Commands, RaceArgs};

//! Cosmo Sync Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Mirrors the national cosmetics notification registry into a tabular sink.
//!
//! # Overview
//!
//! - **Source**: [`source::RegistryApi`] (one HTTP exchange) and
//!   [`source::PagedFetcher`] (bounded retry, failures degrade to empty pages)
//! - **Collection**: [`collector::Collector`] walks every page of a query mode
//!   and reconciles the result against the reported total, calling
//!   [`recovery::Recoverer`] when records are missing
//! - **Projection**: the seven-column summary and the fully flattened view
//!   with shade expansion ([`projection`])
//! - **Sinks**: the narrow [`sink::Sink`] contract, a retrying batched
//!   [`sink::SinkWriter`], and CSV / in-memory implementations
//! - **Pipeline**: [`pipeline::SyncPipeline`] ties it together
//!
//! The registry is unreliable in documented ways: page 0 and page 1 both
//! answer, reported totals drift, and pages come back empty mid-walk. Nothing
//! here trusts a single response.

pub mod collector;
pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod projection;
pub mod recovery;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use config::{SinkConfig, SyncConfig};
pub use error::{Result, SyncError};
pub use model::{Dataset, FilterMode, Record};
pub use pipeline::{PipelineStats, SyncPipeline};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cosmo Sync - cosmetics registry to spreadsheet sync
#[derive(Parser, Debug)]
#[command(name = "cosmo-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute (defaults to a full sync)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (debug logs on the console as well as the log file)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Sink document id
    #[arg(long, env = "COSMO_SHEET_ID", global = true)]
    pub sheet_id: Option<String>,

    /// Root directory of the CSV sink
    #[arg(long, env = "COSMO_OUTPUT_DIR", default_value = "./output", global = true)]
    pub output_dir: PathBuf,

    /// TOML configuration file
    #[arg(short, long, env = "COSMO_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Fetch everything, reconcile, and replace both views
    Sync,

    /// Check the registry API with a small request per query mode; writes nothing
    Test,

    /// Write the first 10 records of each query mode
    Sample,
}

impl Cli {
    /// Command to run; no subcommand means a full sync
    pub fn effective_command(&self) -> Commands {
        self.command.unwrap_or(Commands::Sync)
    }

    /// Layer defaults, the config file, `COSMO_*` variables and flags
    pub fn load_config(&self) -> Result<SyncConfig> {
        let config = match &self.config {
            Some(path) => SyncConfig::from_file(path)?,
            None => SyncConfig::default(),
        };
        let mut config = config.merge_env()?;

        if let Some(sheet_id) = self.sheet_id.as_deref().map(str::trim) {
            if !sheet_id.is_empty() {
                config.sheet_id = Some(sheet_id.to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_sync() {
        let cli = Cli::try_parse_from(["cosmo-sync"]).unwrap();
        assert_eq!(cli.effective_command(), Commands::Sync);
    }

    #[test]
    fn test_parses_subcommands_and_global_flags() {
        let cli = Cli::try_parse_from(["cosmo-sync", "sample", "--sheet-id", "abc", "-v"]).unwrap();
        assert_eq!(cli.effective_command(), Commands::Sample);
        assert_eq!(cli.sheet_id.as_deref(), Some("abc"));
        assert!(cli.verbose);

        let cli = Cli::try_parse_from(["cosmo-sync", "test"]).unwrap();
        assert_eq!(cli.effective_command(), Commands::Test);
    }

    #[test]
    fn test_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["cosmo-sync", "create"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        <Cli as CommandFactory>::command().debug_assert();
    }
}

//! Cosmo Sync - Main entry point

use clap::Parser;
use colored::Colorize;
use cosmo_common::logging::{init_logging, LogConfig, LogLevel, LogOutput, DEFAULT_LOG_FILE_PREFIX};
use cosmo_sync::{commands, Cli, Commands};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // .env first, so clap's env fallbacks see its values
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Both)
            .log_file_prefix(DEFAULT_LOG_FILE_PREFIX)
            .build()
    } else {
        LogConfig::builder()
            .level(LogLevel::Info)
            .output(LogOutput::File)
            .log_file_prefix(DEFAULT_LOG_FILE_PREFIX)
            .build()
    };
    let log_config = match log_config.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring invalid logging environment: {}", e);
            log_config
        },
    };

    // The sync still runs without logging
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        },
    };

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("\n{} {}", "✗".red(), e);
        process::exit(1);
    }
}

/// Execute the selected command
async fn execute_command(cli: &Cli) -> anyhow::Result<()> {
    let command = cli.effective_command();
    let config = cli.load_config()?;
    info!(?command, api_url = %config.api_url, "Starting cosmo-sync");

    if matches!(command, Commands::Sync | Commands::Sample) && config.sheet_id.is_none() {
        anyhow::bail!("Sheet id is not set. Pass --sheet-id or set COSMO_SHEET_ID.");
    }

    let output_dir = cli.output_dir.clone();
    match command {
        Commands::Sync => commands::sync::run(config, output_dir, !cli.verbose).await?,
        Commands::Test => commands::check::run(config, output_dir).await?,
        Commands::Sample => commands::sample::run(config, output_dir).await?,
    }

    Ok(())
}

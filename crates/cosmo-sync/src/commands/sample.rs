//! `cosmo-sync sample`

use super::print_run_summary;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::pipeline::{SyncPipeline, SAMPLE_SIZE};
use crate::sink::CsvSink;
use crate::source::HttpRegistryApi;
use colored::Colorize;
use std::path::PathBuf;

/// Write a small sample of each query mode
pub async fn run(config: SyncConfig, output_dir: PathBuf) -> Result<()> {
    println!(
        "{} Writing a {}-record sample of each view into {}",
        "→".cyan(),
        SAMPLE_SIZE,
        output_dir.display()
    );

    let api = HttpRegistryApi::from_config(&config)?;
    let pipeline = SyncPipeline::new(api, CsvSink::new(output_dir), config);

    let stats = pipeline.run_sample().await?;
    print_run_summary(&stats);
    println!("\n{} Sample written!", "✓".green());
    Ok(())
}

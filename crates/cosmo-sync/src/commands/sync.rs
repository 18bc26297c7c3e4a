//! `cosmo-sync sync` (and the default run)

use super::print_run_summary;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::pipeline::SyncPipeline;
use crate::sink::CsvSink;
use crate::source::HttpRegistryApi;
use colored::Colorize;
use std::path::PathBuf;

/// Full fetch, reconcile and write
pub async fn run(config: SyncConfig, output_dir: PathBuf, show_progress: bool) -> Result<()> {
    println!(
        "{} Syncing registry into {} ({} / {})",
        "→".cyan(),
        output_dir.display(),
        config.filtered_view,
        config.full_view
    );

    let api = HttpRegistryApi::from_config(&config)?;
    let pipeline = SyncPipeline::new(api, CsvSink::new(output_dir), config).with_progress(show_progress);

    let stats = pipeline.run().await?;
    print_run_summary(&stats);

    if stats.has_skipped_view() {
        println!(
            "\n{} Sync completed, but some views received no data and were not updated",
            "!".yellow()
        );
    } else if stats.has_shortfall() {
        println!(
            "\n{} Sync completed with unresolved mismatches; see the log for details",
            "!".yellow()
        );
    } else {
        println!("\n{} Sync completed!", "✓".green());
    }
    Ok(())
}

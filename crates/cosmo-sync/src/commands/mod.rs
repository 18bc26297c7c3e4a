//! Command implementations for the `cosmo-sync` binary
//!
//! Each command prints its own progress narrative and returns an error for
//! anything that should end the process with a non-zero status.

pub mod check;
pub mod sample;
pub mod sync;

use crate::pipeline::{PipelineStats, ViewStats};
use crate::progress::format_elapsed;
use colored::Colorize;

/// Per-view lines shared by the sync and sample summaries
pub(crate) fn print_view_stats(view: &ViewStats) {
    if view.skipped {
        println!(
            "{} {}: no data returned, previous contents left unchanged",
            "!".yellow(),
            view.view.bold()
        );
        return;
    }

    println!(
        "{} {}: {} rows x {} columns (from {} records, registry reported {})",
        "✓".green(),
        view.view.bold(),
        view.rows,
        view.columns,
        view.records,
        view.reported_total
    );

    if view.duplicates > 0 {
        println!("    {} duplicate key(s) dropped", view.duplicates);
    }
    if view.keyless_records > 0 {
        println!("    {} record(s) without a notification code", view.keyless_records);
    }
    if view.recovered > 0 {
        println!("    {} record(s) recovered after the page walk", view.recovered);
    }
    if view.shortfall > 0 {
        println!(
            "    {} {} record(s) still missing against the reported total",
            "!".yellow(),
            view.shortfall
        );
    }
}

pub(crate) fn print_run_summary(stats: &PipelineStats) {
    for view in &stats.views {
        print_view_stats(view);
    }
    println!(
        "{} {} rows written in {}",
        "→".cyan(),
        stats.total_rows(),
        format_elapsed(stats.elapsed())
    );
}

//! End-to-end sync
//!
//! A full run fills two views of one sink document:
//!
//! - the unfiltered registry, projected to the seven summary columns, goes to
//!   the filtered view (`Sheet1_Filtered` by default)
//! - the filtered registry query, projected to every column with shade
//!   expansion, goes to the full view (`Sheet2_AllColumns` by default)
//!
//! Each dataset is collected, projected, written and dropped before the next
//! one starts. An empty filtered dataset leaves the full view untouched.

use crate::collector::{CollectionReport, Collector};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::model::{Dataset, FilterMode};
use crate::progress::{create_page_progress, create_row_progress};
use crate::projection::{project_filtered, project_full, Table};
use crate::sink::{Sink, SinkWriter, WriteSummary};
use crate::source::{PagedFetcher, RegistryApi};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Records per mode fetched by the connectivity check
pub const CONNECTIVITY_SAMPLE_SIZE: u32 = 5;

/// Records per mode written by a sample run
pub const SAMPLE_SIZE: u32 = 10;

/// Per-view outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct ViewStats {
    pub view: String,
    pub mode: FilterMode,
    pub records: usize,
    pub reported_total: u64,
    /// Data rows written, header excluded
    pub rows: usize,
    pub columns: usize,
    pub batches: usize,
    pub duplicates: usize,
    pub keyless_records: usize,
    pub recovered: usize,
    /// Records still missing against the reported total
    pub shortfall: u64,
    /// No data came back, so the view kept its previous contents
    pub skipped: bool,
}

impl ViewStats {
    fn from_collection(report: &CollectionReport, written: &WriteSummary) -> Self {
        Self {
            view: written.view.clone(),
            mode: report.mode,
            records: report.dataset.len(),
            reported_total: report.reported_total,
            rows: written.rows,
            columns: written.columns,
            batches: written.batches,
            duplicates: report.duplicates.len(),
            keyless_records: report.keyless_records,
            recovered: report.recovered() + report.known_code_hits,
            shortfall: report.shortfall(),
            skipped: false,
        }
    }

    fn skipped(report: &CollectionReport, view: &str) -> Self {
        Self {
            view: view.to_string(),
            mode: report.mode,
            records: 0,
            reported_total: report.reported_total,
            rows: 0,
            columns: 0,
            batches: 0,
            duplicates: report.duplicates.len(),
            keyless_records: report.keyless_records,
            recovered: 0,
            shortfall: report.shortfall(),
            skipped: true,
        }
    }

    fn from_sample(mode: FilterMode, dataset: &Dataset, reported_total: u64, written: &WriteSummary) -> Self {
        Self {
            view: written.view.clone(),
            mode,
            records: dataset.len(),
            reported_total,
            rows: written.rows,
            columns: written.columns,
            batches: written.batches,
            duplicates: 0,
            keyless_records: 0,
            recovered: 0,
            shortfall: 0,
            skipped: false,
        }
    }
}

/// Outcome of a full or sample run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub views: Vec<ViewStats>,
}

impl PipelineStats {
    pub fn elapsed(&self) -> std::time::Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }

    pub fn total_rows(&self) -> usize {
        self.views.iter().map(|v| v.rows).sum()
    }

    /// True if any view came up short against its reported total
    pub fn has_shortfall(&self) -> bool {
        self.views.iter().any(|v| v.shortfall > 0)
    }

    /// True if any view was left unchanged for lack of data
    pub fn has_skipped_view(&self) -> bool {
        self.views.iter().any(|v| v.skipped)
    }
}

/// Result of probing one query mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityProbe {
    pub mode: FilterMode,
    pub reported_total: u64,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    pub probes: Vec<ConnectivityProbe>,
}

impl ConnectivityReport {
    /// The registry answered with data for at least one mode
    pub fn is_reachable(&self) -> bool {
        self.probes.iter().any(|p| p.records > 0 || p.reported_total > 0)
    }
}

/// Fetch, reconcile, project and write
pub struct SyncPipeline<A, S> {
    fetcher: PagedFetcher<A>,
    sink: S,
    config: SyncConfig,
    show_progress: bool,
}

impl<A: RegistryApi, S: Sink> SyncPipeline<A, S> {
    pub fn new(api: A, sink: S, config: SyncConfig) -> Self {
        Self {
            fetcher: PagedFetcher::from_config(api, &config),
            sink,
            config,
            show_progress: false,
        }
    }

    /// Draw progress bars while collecting and writing
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Full fetch-reconcile-write cycle
    pub async fn run(&self) -> Result<PipelineStats> {
        let started_at = Utc::now();
        let sheet_id = self.sheet_id()?;

        self.writer().open(sheet_id).await?;
        info!(sheet_id, "Sink opened, starting full sync");

        let mut views = Vec::with_capacity(2);

        let report = self.collect(FilterMode::Unfiltered).await;
        let table = project_filtered(&report.dataset);
        let written = self.write(&self.config.filtered_view, &table).await?;
        views.push(ViewStats::from_collection(&report, &written));
        drop(report);

        let report = self.collect(FilterMode::Filtered).await;
        if report.dataset.is_empty() {
            warn!(view = %self.config.full_view, "No data for the full view, leaving it unchanged");
            views.push(ViewStats::skipped(&report, &self.config.full_view));
        } else {
            let table = project_full(&report.dataset);
            let written = self.write(&self.config.full_view, &table).await?;
            views.push(ViewStats::from_collection(&report, &written));
        }

        let stats = PipelineStats {
            started_at,
            finished_at: Utc::now(),
            views,
        };
        info!(
            total_rows = stats.total_rows(),
            elapsed_secs = stats.elapsed().as_secs(),
            "Sync finished"
        );
        Ok(stats)
    }

    /// Fetch a handful of records per mode without writing anything
    pub async fn check_connectivity(&self) -> ConnectivityReport {
        let mut probes = Vec::with_capacity(2);

        for mode in [FilterMode::Unfiltered, FilterMode::Filtered] {
            let page = self.fetcher.fetch_page(mode, CONNECTIVITY_SAMPLE_SIZE, 1).await;
            info!(%mode, reported_total = page.reported_total, records = page.records.len(), "Connectivity probe");
            probes.push(ConnectivityProbe {
                mode,
                reported_total: page.reported_total,
                records: page.records.len(),
            });
        }

        let report = ConnectivityReport { probes };
        if !report.is_reachable() {
            warn!("Registry returned no data for either query mode");
        }
        report
    }

    /// Write the first page of each mode, trimmed to [`SAMPLE_SIZE`] records
    pub async fn run_sample(&self) -> Result<PipelineStats> {
        let started_at = Utc::now();
        let sheet_id = self.sheet_id()?;

        self.writer().open(sheet_id).await?;
        info!(sheet_id, sample_size = SAMPLE_SIZE, "Sink opened, writing sample");

        let mut views = Vec::with_capacity(2);
        for (mode, view) in [
            (FilterMode::Unfiltered, &self.config.filtered_view),
            (FilterMode::Filtered, &self.config.full_view),
        ] {
            let page = self.fetcher.fetch_page(mode, SAMPLE_SIZE, 1).await;
            let mut dataset = Dataset::new();
            for record in page.records.into_iter().take(SAMPLE_SIZE as usize) {
                dataset.insert(record);
            }

            let table = match mode {
                FilterMode::Unfiltered => project_filtered(&dataset),
                FilterMode::Filtered => project_full(&dataset),
            };
            let written = self.write(view, &table).await?;
            views.push(ViewStats::from_sample(mode, &dataset, page.reported_total, &written));
        }

        Ok(PipelineStats {
            started_at,
            finished_at: Utc::now(),
            views,
        })
    }

    fn sheet_id(&self) -> Result<&str> {
        self.config
            .sheet_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SyncError::config("sheet_id is not set (use --sheet-id or COSMO_SHEET_ID)"))
    }

    fn writer(&self) -> SinkWriter<'_, S> {
        SinkWriter::new(&self.sink, self.config.sink.clone())
    }

    async fn collect(&self, mode: FilterMode) -> CollectionReport {
        let mut collector = Collector::new(&self.fetcher, &self.config);
        if self.show_progress {
            collector = collector.with_progress(create_page_progress(&mode.to_string()));
        }
        collector.collect_all(mode).await
    }

    async fn write(&self, view: &str, table: &Table) -> Result<WriteSummary> {
        info!(view, rows = table.row_count(), columns = table.column_count(), "Writing view");

        let mut writer = self.writer();
        if self.show_progress {
            writer = writer.with_progress(create_row_progress(view));
        }
        Ok(writer.replace_view(view, table).await?)
    }
}

//! Full-set collector
//!
//! Walks the registry page by page and reconciles the results into a
//! [`Dataset`]:
//!
//! 1. Probe page 0 and page 1; the registry answers on both depending on its
//!    mood, so both are merged.
//! 2. Take the reported total and page size from the page 1 probe and
//!    estimate the page count. A zero total ends the walk with an empty set.
//! 3. Walk from page 2 upward until the [`TerminationPolicy`] says stop, or
//!    the page index passes twice the estimate.
//! 4. If fewer records arrived than reported, run the [`Recoverer`].
//! 5. Look up the configured known-missing codes directly.
//!
//! Duplicate keys are dropped (first seen wins) and logged with both pages.

pub mod termination;

pub use termination::{ConsecutiveEmptyPages, Hybrid, PageProgress, TerminationPolicy, TrustReportedTotal};

use crate::config::SyncConfig;
use crate::model::{Dataset, FilterMode, InsertOutcome, Record};
use crate::recovery::{Recoverer, RecoveryReport, RecoveryRequest};
use crate::source::{PagedFetcher, RegistryApi};
use indicatif::ProgressBar;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Why the page walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Both probes reported a zero total
    NoData,
    /// The termination policy fired
    Policy,
    /// Page index passed twice the estimated page count
    SafetyBound,
}

/// A key seen on more than one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub code: String,
    pub first_page: u32,
    pub page: u32,
}

/// Everything one `collect_all` pass produced
#[derive(Debug)]
pub struct CollectionReport {
    pub mode: FilterMode,
    pub dataset: Dataset,
    pub reported_total: u64,
    pub reported_page_size: u64,
    pub estimated_pages: u32,
    /// Highest page index that returned records
    pub last_productive_page: u32,
    /// Page requests issued by the walk itself (probes included)
    pub page_requests: u32,
    pub duplicates: Vec<DuplicateKey>,
    pub keyless_records: usize,
    pub recovery: Option<RecoveryReport>,
    /// Records added from the known-missing lookups
    pub known_code_hits: usize,
    pub stop_reason: StopReason,
}

impl CollectionReport {
    fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            dataset: Dataset::new(),
            reported_total: 0,
            reported_page_size: 0,
            estimated_pages: 0,
            last_productive_page: 0,
            page_requests: 0,
            duplicates: Vec::new(),
            keyless_records: 0,
            recovery: None,
            known_code_hits: 0,
            stop_reason: StopReason::NoData,
        }
    }

    /// Keyed records still unaccounted for against the reported total
    pub fn shortfall(&self) -> u64 {
        self.reported_total.saturating_sub(self.dataset.keyed_len() as u64)
    }

    pub fn recovered(&self) -> usize {
        self.recovery.as_ref().map_or(0, |r| r.records.len())
    }
}

/// Drives the paged fetcher across all pages of one query mode
pub struct Collector<'a, A> {
    fetcher: &'a PagedFetcher<A>,
    config: &'a SyncConfig,
    policy: Box<dyn TerminationPolicy>,
    progress: ProgressBar,
}

impl<'a, A: RegistryApi> Collector<'a, A> {
    /// Collector with the default consecutive-empty-pages policy
    pub fn new(fetcher: &'a PagedFetcher<A>, config: &'a SyncConfig) -> Self {
        Self {
            fetcher,
            config,
            policy: Box::new(ConsecutiveEmptyPages {
                limit: config.empty_page_limit,
            }),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_policy(mut self, policy: impl TerminationPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch and reconcile every record of `mode`
    pub async fn collect_all(&self, mode: FilterMode) -> CollectionReport {
        let per_page = self.config.max_results_per_page;
        let mut report = CollectionReport::new(mode);
        let mut first_seen: HashMap<String, u32> = HashMap::new();

        // Step 1: probe both candidate first pages
        let probe_zero = self.fetcher.fetch_page(mode, per_page, 0).await;
        let probe_one = self.fetcher.fetch_page(mode, per_page, 1).await;
        report.page_requests = 2;

        let mut probe_overlap = 0usize;
        for (page, records) in [(0, probe_zero.records), (1, probe_one.records)] {
            if !records.is_empty() {
                report.last_productive_page = page;
            }
            for record in records {
                if let Some(dup) = self.absorb(&mut report, &mut first_seen, page, record) {
                    // Page 0 and page 1 frequently are the same page
                    if dup.first_page == 0 && dup.page == 1 {
                        probe_overlap += 1;
                    } else {
                        report.duplicates.push(dup);
                    }
                }
            }
        }
        debug!(%mode, probe_overlap, collected = report.dataset.len(), "Probed pages 0 and 1");

        // Step 2: the page 1 figures are authoritative-ish; page 0 is the fallback
        let (reported_total, page_size) = if probe_one.reported_total > 0 {
            (probe_one.reported_total, probe_one.reported_page_size)
        } else {
            (probe_zero.reported_total, probe_zero.reported_page_size)
        };

        if reported_total == 0 {
            warn!(%mode, "Registry reported zero rows; nothing to collect");
            report.dataset = Dataset::new();
            report.stop_reason = StopReason::NoData;
            return report;
        }

        let page_size = if page_size == 0 { u64::from(per_page) } else { page_size };
        let estimated_pages = u32::try_from(reported_total.div_ceil(page_size)).unwrap_or(u32::MAX);
        let safety_bound = estimated_pages.saturating_mul(2);

        report.reported_total = reported_total;
        report.reported_page_size = page_size;
        report.estimated_pages = estimated_pages;

        info!(%mode, reported_total, page_size, estimated_pages, "Starting page walk");
        self.progress.set_length(u64::from(estimated_pages));
        self.progress.set_position(1);

        // Step 3: walk forward until the policy or the safety bound stops us
        let mut page = 2u32;
        let mut consecutive_empty = 0u32;
        report.stop_reason = loop {
            if page > safety_bound {
                warn!(%mode, page, safety_bound, "Page index passed safety bound, stopping walk");
                break StopReason::SafetyBound;
            }

            self.progress.set_message(format!("{} page {}/{}", mode, page, estimated_pages));
            let fetched = self.fetcher.fetch_page(mode, per_page, page).await;
            report.page_requests += 1;
            self.progress.set_position(u64::from(page));

            let page_was_empty = fetched.is_empty();
            if page_was_empty {
                consecutive_empty += 1;
                debug!(%mode, page, consecutive_empty, "Empty page");
            } else {
                consecutive_empty = 0;
                report.last_productive_page = page;
                for record in fetched.records {
                    if let Some(dup) = self.absorb(&mut report, &mut first_seen, page, record) {
                        report.duplicates.push(dup);
                    }
                }
            }

            let progress = PageProgress {
                page,
                page_was_empty,
                consecutive_empty,
                collected: report.dataset.len(),
                reported_total,
                estimated_pages,
            };
            if self.policy.should_stop(&progress) {
                debug!(%mode, page, policy = self.policy.name(), "Termination policy fired");
                break StopReason::Policy;
            }

            page += 1;
        };

        if !report.duplicates.is_empty() {
            warn!(%mode, duplicates = report.duplicates.len(), "Dropped duplicate keys during collection");
        }

        // Step 4: reconcile against the reported total; keyless records never match it
        let actual = report.dataset.keyed_len() as u64;
        if actual < reported_total {
            let expected_missing = usize::try_from(reported_total - actual).unwrap_or(usize::MAX);
            warn!(
                %mode,
                actual,
                reported_total,
                expected_missing,
                "ReconciliationMismatch: fewer records than reported, starting recovery"
            );

            let request = RecoveryRequest {
                mode,
                last_productive_page: report.last_productive_page,
                estimated_pages,
                expected_missing,
                reported_total,
            };
            let recovery = Recoverer::new(self.fetcher, self.config)
                .recover_missing(&report.dataset, &request)
                .await;

            for record in recovery.records.iter().cloned() {
                report.dataset.insert(record);
            }
            report.recovery = Some(recovery);
        } else if actual > reported_total {
            warn!(%mode, actual, reported_total, "Collected more records than the registry reported");
        }

        // Step 5: known problem keys
        report.known_code_hits = self.lookup_known_codes(&mut report.dataset, mode).await;

        let shortfall = report.shortfall();
        if shortfall > 0 {
            warn!(
                %mode,
                collected = report.dataset.len(),
                reported_total,
                shortfall,
                "Unresolved mismatch after recovery"
            );
        }

        self.progress.finish_and_clear();
        info!(
            %mode,
            collected = report.dataset.len(),
            reported_total,
            page_requests = report.page_requests,
            stop_reason = ?report.stop_reason,
            "Collection finished"
        );

        report
    }

    /// Add a record, returning the duplicate if its key was already seen
    fn absorb(
        &self,
        report: &mut CollectionReport,
        first_seen: &mut HashMap<String, u32>,
        page: u32,
        record: Record,
    ) -> Option<DuplicateKey> {
        match report.dataset.insert(record) {
            InsertOutcome::Added => {
                if let Some(code) = report.dataset.records().last().and_then(Record::notification_code) {
                    first_seen.insert(code, page);
                }
                None
            },
            InsertOutcome::Duplicate(code) => {
                let first_page = first_seen.get(&code).copied().unwrap_or(page);
                if !(first_page == 0 && page == 1) {
                    debug!(code = %code, first_page, page, "Duplicate key");
                }
                Some(DuplicateKey { code, first_page, page })
            },
            InsertOutcome::MissingKey => {
                report.keyless_records += 1;
                warn!(page, "Record without notificationCode");
                None
            },
        }
    }

    async fn lookup_known_codes(&self, dataset: &mut Dataset, mode: FilterMode) -> usize {
        let mut hits = 0;

        for code in &self.config.known_missing_codes {
            if dataset.contains(code) {
                continue;
            }

            match self.fetcher.fetch_by_key(code, mode).await {
                Some(record) => {
                    if dataset.insert(record) == InsertOutcome::Added {
                        info!(%mode, code = %code, "Known-missing code found by direct lookup");
                        hits += 1;
                    }
                },
                None => debug!(%mode, code = %code, "Known-missing code not found"),
            }
        }

        hits
    }
}

//! Missing-record recovery
//!
//! Runs when a collection pass ends with fewer records than the registry
//! reported. Strategies run in order and stop as soon as enough unseen keys
//! have been found:
//!
//! - re-fetch the window of pages ending at the last productive page
//! - re-probe page 1 and compare its total with the first one (diagnostic only)
//! - scan forward past the last productive page
//! - walk the first pages in descending order, which reach the tail of the
//!   result set from the other end
//! - filtered mode only: probe page 0 and look up the known-missing codes,
//!   filtered first and unfiltered second
//!
//! Recovery is best effort. Coming back empty-handed is logged, never raised.

use crate::config::SyncConfig;
use crate::model::{Dataset, FilterMode, Record};
use crate::source::{PagedFetcher, RegistryApi};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Inputs for one recovery pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRequest {
    pub mode: FilterMode,
    pub last_productive_page: u32,
    pub estimated_pages: u32,
    pub expected_missing: usize,
    /// Total reported when the collection pass started
    pub reported_total: u64,
}

/// Movement of the reported total between the first probe and the re-probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalDrift {
    Unchanged,
    /// Records were probably added upstream during the run
    Grew(u64),
    /// Records were probably deleted upstream during the run
    Shrank(u64),
    /// The re-probe itself came back empty
    Unknown,
}

/// Strategy that located records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryStrategy {
    WindowRefetch,
    ForwardScan,
    OrderReversal,
    FilteredPageZero,
    DirectLookup,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveryStrategy::WindowRefetch => "window-refetch",
            RecoveryStrategy::ForwardScan => "forward-scan",
            RecoveryStrategy::OrderReversal => "order-reversal",
            RecoveryStrategy::FilteredPageZero => "filtered-page-zero",
            RecoveryStrategy::DirectLookup => "direct-lookup",
        };
        f.write_str(name)
    }
}

/// Outcome of a recovery pass
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    /// Shortfall the pass was asked to close
    pub expected_missing: usize,
    /// Records absent from the dataset, in the order they were found
    pub records: Vec<Record>,
    pub total_drift: Option<TotalDrift>,
    /// (strategy, records found) for every strategy that found something
    pub found_by: Vec<(RecoveryStrategy, usize)>,
}

impl RecoveryReport {
    pub fn found(&self) -> usize {
        self.records.len()
    }
}

/// Unseen-key accumulator shared by the strategies
struct Finds<'d> {
    dataset: &'d Dataset,
    keys: HashSet<String>,
    records: Vec<Record>,
}

impl<'d> Finds<'d> {
    fn new(dataset: &'d Dataset) -> Self {
        Self {
            dataset,
            keys: HashSet::new(),
            records: Vec::new(),
        }
    }

    /// Keep `record` if its key is neither in the dataset nor already found
    fn offer(&mut self, record: Record) -> bool {
        let Some(code) = record.notification_code() else {
            return false;
        };
        if self.dataset.contains(&code) || !self.keys.insert(code) {
            return false;
        }
        self.records.push(record);
        true
    }

    fn offer_all(&mut self, records: Vec<Record>) -> usize {
        let mut added = 0;
        for record in records {
            if self.offer(record) {
                added += 1;
            }
        }
        added
    }

    fn knows(&self, code: &str) -> bool {
        self.dataset.contains(code) || self.keys.contains(code)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Locates records that the page walk missed
pub struct Recoverer<'a, A> {
    fetcher: &'a PagedFetcher<A>,
    config: &'a SyncConfig,
}

impl<'a, A: RegistryApi> Recoverer<'a, A> {
    pub fn new(fetcher: &'a PagedFetcher<A>, config: &'a SyncConfig) -> Self {
        Self { fetcher, config }
    }

    /// Try to find `request.expected_missing` records absent from `dataset`
    pub async fn recover_missing(&self, dataset: &Dataset, request: &RecoveryRequest) -> RecoveryReport {
        let mode = request.mode;
        let per_page = self.config.max_results_per_page;
        let mut finds = Finds::new(dataset);
        let mut report = RecoveryReport {
            expected_missing: request.expected_missing,
            ..RecoveryReport::default()
        };

        info!(
            %mode,
            expected_missing = request.expected_missing,
            last_productive_page = request.last_productive_page,
            estimated_pages = request.estimated_pages,
            "Starting missing-record recovery"
        );

        // Window re-fetch behind the last productive page
        let window_end = request.last_productive_page.max(1);
        let window_start = window_end
            .saturating_sub(self.config.recovery_window_pages.saturating_sub(1))
            .max(1);
        let mut found = 0;
        for page in window_start..=window_end {
            if finds.len() >= request.expected_missing {
                break;
            }
            let fetched = self
                .fetcher
                .fetch_page_with_attempts(mode, per_page, page, self.config.recovery_page_attempts)
                .await;
            let new = finds.offer_all(fetched.records);
            if new > 0 {
                debug!(%mode, page, new, "Window re-fetch found unseen records");
            }
            found += new;
        }
        record_strategy(&mut report, RecoveryStrategy::WindowRefetch, found);

        // Re-probe the total; this explains a mismatch but recovers nothing
        let reprobe = self.fetcher.fetch_page(mode, per_page, 1).await;
        let drift = classify_drift(request.reported_total, reprobe.reported_total);
        match drift {
            TotalDrift::Unchanged => debug!(%mode, "Reported total unchanged on re-probe"),
            TotalDrift::Grew(by) => {
                warn!(%mode, by, "Reported total grew during the run; records were likely added upstream")
            },
            TotalDrift::Shrank(by) => {
                warn!(%mode, by, "Reported total shrank during the run; records were likely deleted upstream")
            },
            TotalDrift::Unknown => warn!(%mode, "Re-probe of page 1 returned nothing"),
        }
        report.total_drift = Some(drift);

        // Forward scan past the last productive page
        if finds.len() < request.expected_missing {
            let scan_end = request
                .estimated_pages
                .saturating_add(self.config.recovery_forward_slack)
                .min(
                    request
                        .last_productive_page
                        .saturating_add(self.config.recovery_forward_limit),
                );
            let mut found = 0;
            for page in request.last_productive_page.saturating_add(1)..=scan_end {
                if finds.len() >= request.expected_missing {
                    break;
                }
                let fetched = self.fetcher.fetch_page(mode, per_page, page).await;
                let new = finds.offer_all(fetched.records);
                if new > 0 {
                    debug!(%mode, page, new, "Forward scan found unseen records");
                }
                found += new;
            }
            record_strategy(&mut report, RecoveryStrategy::ForwardScan, found);
        }

        // Descending walk over just enough pages to cover the shortfall
        if finds.len() < request.expected_missing {
            let pages = reversal_pages(request.expected_missing, per_page, self.config.recovery_window_pages);
            let mut found = 0;
            for page in 1..=pages {
                if finds.len() >= request.expected_missing {
                    break;
                }
                let fetched = self.fetcher.fetch_page_descending(mode, per_page, page).await;
                if fetched.is_empty() {
                    break;
                }
                let new = finds.offer_all(fetched.records);
                if new > 0 {
                    debug!(%mode, page, new, "Descending probe found unseen records");
                }
                found += new;
            }
            record_strategy(&mut report, RecoveryStrategy::OrderReversal, found);
        }

        // Filtered view: page 0 probe plus direct lookups of the known-missing codes
        if mode == FilterMode::Filtered && finds.len() < request.expected_missing {
            let probe = self.fetcher.fetch_page(FilterMode::Filtered, per_page, 0).await;
            let found = finds.offer_all(probe.records);
            record_strategy(&mut report, RecoveryStrategy::FilteredPageZero, found);

            let mut found = 0;
            for code in &self.config.known_missing_codes {
                if finds.len() >= request.expected_missing {
                    break;
                }
                if finds.knows(code) {
                    continue;
                }
                if let Some(record) = self.lookup_either(code).await {
                    if finds.offer(record) {
                        found += 1;
                    }
                }
            }
            record_strategy(&mut report, RecoveryStrategy::DirectLookup, found);
        }

        report.records = finds.records;

        if report.records.is_empty() {
            warn!(
                %mode,
                expected_missing = request.expected_missing,
                reported_total = request.reported_total,
                collected = dataset.len(),
                drift = ?drift,
                "Recovery found no missing records. Likely causes: the reported total is \
                 inaccurate, records were deleted upstream, or the server paginates inconsistently"
            );
        } else if report.found() < request.expected_missing {
            warn!(
                %mode,
                found = report.found(),
                expected_missing = request.expected_missing,
                "Recovery was partial"
            );
        } else {
            info!(%mode, found = report.found(), "Recovery located all missing records");
        }

        report
    }

    /// Filtered lookup first, unfiltered as fallback
    async fn lookup_either(&self, code: &str) -> Option<Record> {
        if let Some(record) = self.fetcher.fetch_by_key(code, FilterMode::Filtered).await {
            return Some(record);
        }
        self.fetcher.fetch_by_key(code, FilterMode::Unfiltered).await
    }
}

fn record_strategy(report: &mut RecoveryReport, strategy: RecoveryStrategy, found: usize) {
    if found > 0 {
        info!(%strategy, found, "Recovery strategy located records");
        report.found_by.push((strategy, found));
    }
}

/// Descending pages needed to cover `missing` records, plus one for boundary shifts
fn reversal_pages(missing: usize, per_page: u32, limit: u32) -> u32 {
    let per_page = per_page.max(1) as usize;
    let pages = u32::try_from(missing.div_ceil(per_page)).unwrap_or(u32::MAX);
    pages.saturating_add(1).min(limit.max(1))
}

/// Compare the initial total with a fresh one
pub fn classify_drift(initial: u64, fresh: u64) -> TotalDrift {
    match fresh {
        0 => TotalDrift::Unknown,
        f if f > initial => TotalDrift::Grew(f - initial),
        f if f < initial => TotalDrift::Shrank(initial - f),
        _ => TotalDrift::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_drift() {
        assert_eq!(classify_drift(250, 250), TotalDrift::Unchanged);
        assert_eq!(classify_drift(250, 260), TotalDrift::Grew(10));
        assert_eq!(classify_drift(250, 212), TotalDrift::Shrank(38));
        assert_eq!(classify_drift(250, 0), TotalDrift::Unknown);
    }

    #[test]
    fn test_reversal_pages() {
        assert_eq!(reversal_pages(38, 100, 10), 2);
        assert_eq!(reversal_pages(250, 100, 10), 4);
        assert_eq!(reversal_pages(5000, 100, 10), 10);
        assert_eq!(reversal_pages(1, 0, 0), 1);
    }
}

//! Termination policies for the page walk
//!
//! The registry's reported total cannot be trusted, so "when have we seen
//! everything" is a pluggable decision. The walk also enforces its own hard
//! bound of twice the estimated page count, whatever the policy says.

/// Snapshot handed to a policy after every fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// Page index just fetched
    pub page: u32,
    pub page_was_empty: bool,
    /// Empty pages in a row, including this one
    pub consecutive_empty: u32,
    /// Unique records collected so far
    pub collected: usize,
    pub reported_total: u64,
    pub estimated_pages: u32,
}

/// Decides whether the page walk should stop
pub trait TerminationPolicy: Send + Sync {
    fn should_stop(&self, progress: &PageProgress) -> bool;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Stop after `limit` empty pages in a row; ignores the reported total
#[derive(Debug, Clone, Copy)]
pub struct ConsecutiveEmptyPages {
    pub limit: u32,
}

impl Default for ConsecutiveEmptyPages {
    fn default() -> Self {
        Self {
            limit: crate::config::DEFAULT_EMPTY_PAGE_LIMIT,
        }
    }
}

impl TerminationPolicy for ConsecutiveEmptyPages {
    fn should_stop(&self, progress: &PageProgress) -> bool {
        progress.consecutive_empty >= self.limit
    }

    fn name(&self) -> &'static str {
        "consecutive-empty-pages"
    }
}

/// Stop once the reported total is reached or the estimated pages are done
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustReportedTotal;

impl TerminationPolicy for TrustReportedTotal {
    fn should_stop(&self, progress: &PageProgress) -> bool {
        progress.collected as u64 >= progress.reported_total || progress.page >= progress.estimated_pages
    }

    fn name(&self) -> &'static str {
        "trust-reported-total"
    }
}

/// Stop on whichever comes first: the empty-page streak or the reported total
#[derive(Debug, Clone, Copy, Default)]
pub struct Hybrid {
    pub empty_pages: ConsecutiveEmptyPages,
}

impl TerminationPolicy for Hybrid {
    fn should_stop(&self, progress: &PageProgress) -> bool {
        self.empty_pages.should_stop(progress) || progress.collected as u64 >= progress.reported_total
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(page: u32, consecutive_empty: u32, collected: usize) -> PageProgress {
        PageProgress {
            page,
            page_was_empty: consecutive_empty > 0,
            consecutive_empty,
            collected,
            reported_total: 250,
            estimated_pages: 3,
        }
    }

    #[test]
    fn test_consecutive_empty_ignores_total() {
        let policy = ConsecutiveEmptyPages::default();
        assert!(!policy.should_stop(&progress(3, 0, 250)));
        assert!(!policy.should_stop(&progress(4, 1, 250)));
        assert!(policy.should_stop(&progress(5, 2, 250)));
    }

    #[test]
    fn test_trust_total_stops_at_count_or_last_page() {
        let policy = TrustReportedTotal;
        assert!(!policy.should_stop(&progress(2, 0, 200)));
        assert!(policy.should_stop(&progress(2, 0, 250)));
        assert!(policy.should_stop(&progress(3, 0, 212)));
    }

    #[test]
    fn test_hybrid_takes_either_signal() {
        let policy = Hybrid::default();
        assert!(policy.should_stop(&progress(3, 0, 250)));
        assert!(policy.should_stop(&progress(6, 2, 212)));
        assert!(!policy.should_stop(&progress(4, 1, 212)));
    }
}

//! Paged fetcher with bounded retry
//!
//! Every request is tried a fixed number of times with a fixed pause between
//! attempts. A request that never succeeds does not fail the run: it degrades
//! to an empty page (or a missed lookup) and is logged as `FetchFailed`.

use super::types::CosmeticsQuery;
use super::{CosmeticsResponse, RegistryApi};
use crate::config::SyncConfig;
use crate::model::{FilterMode, Page, Record};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Issues single-page and single-key requests with retry
pub struct PagedFetcher<A> {
    api: A,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<A: RegistryApi> PagedFetcher<A> {
    pub fn new(api: A, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            api,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(api: A, config: &SyncConfig) -> Self {
        Self::new(api, config.fetch_max_attempts, config.fetch_retry_delay())
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch one page using the configured attempt budget
    pub async fn fetch_page(&self, mode: FilterMode, max_results: u32, page_number: u32) -> Page {
        self.fetch_page_with_attempts(mode, max_results, page_number, self.max_attempts)
            .await
    }

    /// Fetch one page with an explicit attempt budget
    pub async fn fetch_page_with_attempts(
        &self,
        mode: FilterMode,
        max_results: u32,
        page_number: u32,
        attempts: u32,
    ) -> Page {
        let query = CosmeticsQuery::page(mode, max_results, page_number);
        self.fetch_query(mode, &query, attempts).await
    }

    /// Fetch one page with the server's ordering reversed
    pub async fn fetch_page_descending(&self, mode: FilterMode, max_results: u32, page_number: u32) -> Page {
        let query = CosmeticsQuery::page(mode, max_results, page_number).descending();
        self.fetch_query(mode, &query, self.max_attempts).await
    }

    async fn fetch_query(&self, mode: FilterMode, query: &CosmeticsQuery, attempts: u32) -> Page {
        match self.query_with_retry(query, attempts).await {
            Some(response) => {
                let page = response.into_page(query.max_result);
                debug!(
                    %mode,
                    page = query.page_number,
                    descending = query.is_descending,
                    records = page.records.len(),
                    reported_total = page.reported_total,
                    "Fetched page"
                );
                page
            },
            None => Page::empty(query.max_result),
        }
    }

    /// Look a record up directly by its notification code
    ///
    /// Only a record whose key matches is returned; anything else the server
    /// sends back is ignored.
    pub async fn fetch_by_key(&self, code: &str, mode: FilterMode) -> Option<Record> {
        let query = CosmeticsQuery::by_key(mode, code);
        let response = self.query_with_retry(&query, self.max_attempts).await?;

        let found = response
            .into_page(query.max_result)
            .records
            .into_iter()
            .find(|record| record.notification_code().as_deref() == Some(code));

        debug!(%mode, code, found = found.is_some(), "Direct key lookup");
        found
    }

    async fn query_with_retry(&self, query: &CosmeticsQuery, attempts: u32) -> Option<CosmeticsResponse> {
        let attempts = attempts.max(1);

        for attempt in 1..=attempts {
            match self.api.query(query).await {
                Ok(response) => return Some(response),
                Err(e) if attempt < attempts => {
                    warn!(
                        page = query.page_number,
                        code = query.notification_code.as_deref().unwrap_or(""),
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Registry request failed, retrying in {:?}",
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                },
                Err(e) => {
                    error!(
                        page = query.page_number,
                        code = query.notification_code.as_deref().unwrap_or(""),
                        attempts,
                        error = %e,
                        "FetchFailed: giving up on registry request, treating as empty"
                    );
                },
            }
        }

        None
    }
}

//! Shared fixtures for the sync integration tests
//!
//! [`ScriptedRegistry`] is an in-memory [`RegistryApi`] whose pages, totals,
//! failures and key lookups are set up per query mode. Every query it
//! receives is recorded so tests can assert on the exact call sequence.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use cosmo_sync::model::FilterMode;
use cosmo_sync::source::{CosmeticsQuery, CosmeticsResponse, RegistryApi, ReturnObject};
use cosmo_sync::{SyncConfig, SyncError};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct ModeScript {
    total: u64,
    page_size: u64,
    /// Successive responses per page; the last one repeats
    pages: HashMap<u32, VecDeque<Vec<Value>>>,
    /// Pages served to descending queries
    descending: HashMap<u32, Vec<Value>>,
    /// Successive totals reported on page 1; `total` once exhausted
    page_one_totals: VecDeque<u64>,
    /// Remaining failures per page
    failures: HashMap<u32, u32>,
    lookups: HashMap<String, Value>,
}

impl ModeScript {
    fn respond(&mut self, query: &CosmeticsQuery) -> Result<Vec<Value>, ()> {
        if let Some(code) = &query.notification_code {
            return Ok(self.lookups.get(code).cloned().into_iter().collect());
        }

        let page = query.page_number;
        if let Some(remaining) = self.failures.get_mut(&page) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(());
            }
        }

        if query.is_descending {
            return Ok(self.descending.get(&page).cloned().unwrap_or_default());
        }

        let records = match self.pages.get_mut(&page) {
            Some(seq) if seq.len() > 1 => seq.pop_front().unwrap_or_default(),
            Some(seq) => seq.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(records)
    }

    fn total_for(&mut self, query: &CosmeticsQuery) -> u64 {
        if query.page_number == 1 && query.notification_code.is_none() && !query.is_descending {
            if let Some(total) = self.page_one_totals.pop_front() {
                return total;
            }
        }
        self.total
    }
}

/// In-memory registry driven by a per-mode script
#[derive(Debug, Default)]
pub struct ScriptedRegistry {
    modes: Mutex<HashMap<FilterMode, ModeScript>>,
    calls: Mutex<Vec<CosmeticsQuery>>,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_mode(self, mode: FilterMode, edit: impl FnOnce(&mut ModeScript)) -> Self {
        {
            let mut modes = self.modes.lock().unwrap();
            let script = modes.entry(mode).or_insert_with(|| ModeScript {
                page_size: 100,
                ..ModeScript::default()
            });
            edit(script);
        }
        self
    }

    /// Reported total and page size for every response of `mode`
    pub fn totals(self, mode: FilterMode, total: u64, page_size: u64) -> Self {
        self.with_mode(mode, |s| {
            s.total = total;
            s.page_size = page_size;
        })
    }

    pub fn page(self, mode: FilterMode, page: u32, records: Vec<Value>) -> Self {
        self.page_sequence(mode, page, vec![records])
    }

    /// Different content on successive fetches of one page
    pub fn page_sequence(self, mode: FilterMode, page: u32, responses: Vec<Vec<Value>>) -> Self {
        self.with_mode(mode, |s| {
            s.pages.insert(page, responses.into());
        })
    }

    /// Page served when the query asks for descending order
    pub fn descending_page(self, mode: FilterMode, page: u32, records: Vec<Value>) -> Self {
        self.with_mode(mode, |s| {
            s.descending.insert(page, records);
        })
    }

    /// Totals for successive page-1 responses, e.g. to simulate drift
    pub fn page_one_totals(self, mode: FilterMode, totals: Vec<u64>) -> Self {
        self.with_mode(mode, |s| s.page_one_totals = totals.into())
    }

    /// Fail the next `times` requests for `page`
    pub fn fail_page(self, mode: FilterMode, page: u32, times: u32) -> Self {
        self.with_mode(mode, |s| {
            s.failures.insert(page, times);
        })
    }

    /// Record returned by a direct key lookup in `mode`
    pub fn lookup(self, mode: FilterMode, record: Value) -> Self {
        let code = record["notificationCode"].as_str().unwrap().to_string();
        self.with_mode(mode, |s| {
            s.lookups.insert(code, record);
        })
    }

    pub fn calls(&self) -> Vec<CosmeticsQuery> {
        self.calls.lock().unwrap().clone()
    }

    /// Ascending page numbers requested in `mode`, key lookups excluded
    pub fn page_calls(&self, mode: FilterMode) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter(|q| mode_of(q) == mode && q.notification_code.is_none() && !q.is_descending)
            .map(|q| q.page_number)
            .collect()
    }

    pub fn descending_calls(&self, mode: FilterMode) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter(|q| mode_of(q) == mode && q.is_descending)
            .map(|q| q.page_number)
            .collect()
    }

    /// Codes looked up directly in `mode`
    pub fn key_calls(&self, mode: FilterMode) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|q| mode_of(q) == mode)
            .filter_map(|q| q.notification_code)
            .collect()
    }
}

fn mode_of(query: &CosmeticsQuery) -> FilterMode {
    if query.business_notification_item_id.is_some() {
        FilterMode::Filtered
    } else {
        FilterMode::Unfiltered
    }
}

#[async_trait]
impl RegistryApi for ScriptedRegistry {
    async fn query(&self, query: &CosmeticsQuery) -> cosmo_sync::Result<CosmeticsResponse> {
        self.calls.lock().unwrap().push(query.clone());

        let mut modes = self.modes.lock().unwrap();
        let script = modes.entry(mode_of(query)).or_default();

        let records = script
            .respond(query)
            .map_err(|_| SyncError::config(format!("scripted outage on page {}", query.page_number)))?;
        let total = script.total_for(query);

        Ok(CosmeticsResponse {
            return_object: Some(ReturnObject {
                cosmetics_list: Some(records),
                total_rows: Some(total),
                max_results: Some(script.page_size),
            }),
        })
    }
}

/// `count` records keyed `{prefix}-{start}` onwards
pub fn records(prefix: &str, start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| {
            json!({
                "nameCosmeticHeb": format!("מוצר {i}"),
                "nameCosmeticEng": format!("Product {i}"),
                "notificationCode": format!("{prefix}-{i}"),
                "importTrack": i % 3,
                "rpCorporation": "RP Ltd",
                "manufacturer": "Acme",
                "importer": "Imports Inc"
            })
        })
        .collect()
}

/// Config with no retry pauses and no batch delay
pub fn test_config() -> SyncConfig {
    let mut config = SyncConfig {
        fetch_retry_delay_secs: 0,
        sheet_id: Some("test-sheet".to_string()),
        ..SyncConfig::default()
    };
    config.sink.batch_delay_millis = 0;
    config.sink.initial_backoff_millis = 0;
    config
}

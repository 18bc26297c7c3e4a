//! Configuration for a sync run
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `COSMO_*` environment variables, then CLI flags (applied by the binary).

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Registry API Constants
// ============================================================================

/// Cosmetics registry search endpoint
pub const DEFAULT_API_URL: &str = "https://registries.health.gov.il/api/Cosmetics/GetCosmetics";

/// Records requested per page during a full fetch
pub const DEFAULT_MAX_RESULTS_PER_PAGE: u32 = 100;

/// Attempts per page request before degrading to an empty page
pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;

/// Fixed pause between page request attempts
pub const DEFAULT_FETCH_RETRY_DELAY_SECS: u64 = 2;

/// Consecutive empty pages that end a collection pass
pub const DEFAULT_EMPTY_PAGE_LIMIT: u32 = 2;

// ============================================================================
// Sink Constants
// ============================================================================

/// Rows per append call
pub const DEFAULT_SINK_BATCH_SIZE: usize = 5000;

pub const DEFAULT_FILTERED_VIEW: &str = "Sheet1_Filtered";
pub const DEFAULT_FULL_VIEW: &str = "Sheet2_AllColumns";

/// Sync run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Registry endpoint receiving the JSON POST queries
    pub api_url: String,

    /// HTTP timeout per request in seconds
    pub request_timeout_secs: u64,

    /// Page size requested from the registry
    pub max_results_per_page: u32,

    /// Attempts per page request (first try included)
    pub fetch_max_attempts: u32,

    /// Delay between page request attempts in seconds
    pub fetch_retry_delay_secs: u64,

    /// Consecutive empty pages treated as the end of the data
    pub empty_page_limit: u32,

    /// Pages re-fetched behind the last productive page during recovery
    pub recovery_window_pages: u32,

    /// Attempts per page during the recovery window re-fetch
    pub recovery_page_attempts: u32,

    /// How far past the estimated page count the forward scan may go
    pub recovery_forward_slack: u32,

    /// How far past the last productive page the forward scan may go
    pub recovery_forward_limit: u32,

    /// Notification codes that historically went missing from paging and are
    /// always looked up directly
    pub known_missing_codes: Vec<String>,

    /// Sink identifier (spreadsheet id, or directory name for the CSV sink)
    pub sheet_id: Option<String>,

    /// View receiving the seven-column projection of the unfiltered query
    pub filtered_view: String,

    /// View receiving the flattened projection of the filtered query
    pub full_view: String,

    pub sink: SinkConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 60,
            max_results_per_page: DEFAULT_MAX_RESULTS_PER_PAGE,
            fetch_max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
            fetch_retry_delay_secs: DEFAULT_FETCH_RETRY_DELAY_SECS,
            empty_page_limit: DEFAULT_EMPTY_PAGE_LIMIT,
            recovery_window_pages: 10,
            recovery_page_attempts: 5,
            recovery_forward_slack: 20,
            recovery_forward_limit: 30,
            known_missing_codes: Vec::new(),
            sheet_id: None,
            filtered_view: DEFAULT_FILTERED_VIEW.to_string(),
            full_view: DEFAULT_FULL_VIEW.to_string(),
            sink: SinkConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load a TOML file over the defaults; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Apply `COSMO_*` environment variables over this configuration
    ///
    /// - `COSMO_API_URL`
    /// - `COSMO_REQUEST_TIMEOUT_SECS`
    /// - `COSMO_MAX_RESULTS_PER_PAGE`
    /// - `COSMO_FETCH_MAX_ATTEMPTS`
    /// - `COSMO_SHEET_ID`
    /// - `COSMO_KNOWN_MISSING_CODES` (comma separated)
    /// - `COSMO_SINK_BATCH_SIZE`
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("COSMO_API_URL") {
            self.api_url = url;
        }

        if let Some(secs) = parse_env("COSMO_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = secs;
        }

        if let Some(size) = parse_env("COSMO_MAX_RESULTS_PER_PAGE")? {
            self.max_results_per_page = size;
        }

        if let Some(attempts) = parse_env("COSMO_FETCH_MAX_ATTEMPTS")? {
            self.fetch_max_attempts = attempts;
        }

        if let Ok(id) = std::env::var("COSMO_SHEET_ID") {
            if !id.trim().is_empty() {
                self.sheet_id = Some(id.trim().to_string());
            }
        }

        if let Ok(codes) = std::env::var("COSMO_KNOWN_MISSING_CODES") {
            self.known_missing_codes = codes
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(size) = parse_env("COSMO_SINK_BATCH_SIZE")? {
            self.sink.batch_size = size;
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(SyncError::config("API URL cannot be empty"));
        }

        if self.request_timeout_secs == 0 {
            return Err(SyncError::config("Request timeout must be greater than 0"));
        }

        if self.max_results_per_page == 0 {
            return Err(SyncError::config("max_results_per_page must be greater than 0"));
        }

        if self.fetch_max_attempts == 0 || self.recovery_page_attempts == 0 {
            return Err(SyncError::config("Attempt counts must be at least 1"));
        }

        if self.empty_page_limit == 0 {
            return Err(SyncError::config("empty_page_limit must be at least 1"));
        }

        self.sink.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_retry_delay(&self) -> Duration {
        Duration::from_secs(self.fetch_retry_delay_secs)
    }
}

/// Batching and retry settings for sink writes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Rows per append call
    pub batch_size: usize,

    /// Pause between append batches (rate limit)
    pub batch_delay_millis: u64,

    /// Attempts per sink call for retryable errors (first try included)
    pub max_attempts: u32,

    /// First backoff delay; doubles on every retry
    pub initial_backoff_millis: u64,

    /// Upper bound for a single backoff delay
    pub max_backoff_millis: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SINK_BATCH_SIZE,
            batch_delay_millis: 1000,
            max_attempts: 5,
            initial_backoff_millis: 1000,
            max_backoff_millis: 32_000,
        }
    }
}

impl SinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SyncError::config("Sink batch size must be greater than 0"));
        }

        if self.max_attempts == 0 {
            return Err(SyncError::config("Sink max_attempts must be at least 1"));
        }

        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_millis)
    }

    /// Backoff before retry number `retry` (1-based): initial * 2^(retry-1), capped
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        let millis = self
            .initial_backoff_millis
            .saturating_mul(factor)
            .min(self.max_backoff_millis);
        Duration::from_millis(millis)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SyncError::config(format!("{} has an invalid value '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_match_registry_constants() {
        let config = SyncConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.max_results_per_page, 100);
        assert_eq!(config.fetch_max_attempts, 3);
        assert_eq!(config.fetch_retry_delay(), Duration::from_secs(2));
        assert_eq!(config.sink.batch_size, 5000);
        assert!(config.known_missing_codes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let config = SyncConfig {
            max_results_per_page: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let sink = SinkConfig {
            initial_backoff_millis: 500,
            max_backoff_millis: 3000,
            ..SinkConfig::default()
        };
        assert_eq!(sink.backoff_for(1), Duration::from_millis(500));
        assert_eq!(sink.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(sink.backoff_for(3), Duration::from_millis(2000));
        assert_eq!(sink.backoff_for(4), Duration::from_millis(3000));
        assert_eq!(sink.backoff_for(40), Duration::from_millis(3000));
    }

    #[test]
    fn test_from_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cosmo.toml");
        std::fs::write(
            &path,
            r#"
max_results_per_page = 50
known_missing_codes = ["A-100", "B-200"]

[sink]
batch_size = 200
"#,
        )
        .unwrap();

        let config = SyncConfig::from_file(&path).unwrap();
        assert_eq!(config.max_results_per_page, 50);
        assert_eq!(config.known_missing_codes, vec!["A-100", "B-200"]);
        assert_eq!(config.sink.batch_size, 200);
        assert_eq!(config.sink.max_attempts, 5);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    #[serial]
    fn test_merge_env_overrides() {
        std::env::set_var("COSMO_SHEET_ID", " sheet-123 ");
        std::env::set_var("COSMO_KNOWN_MISSING_CODES", "X1, ,X2");
        std::env::set_var("COSMO_MAX_RESULTS_PER_PAGE", "25");

        let config = SyncConfig::from_env().unwrap();
        assert_eq!(config.sheet_id.as_deref(), Some("sheet-123"));
        assert_eq!(config.known_missing_codes, vec!["X1", "X2"]);
        assert_eq!(config.max_results_per_page, 25);

        std::env::remove_var("COSMO_SHEET_ID");
        std::env::remove_var("COSMO_KNOWN_MISSING_CODES");
        std::env::remove_var("COSMO_MAX_RESULTS_PER_PAGE");
    }

    #[test]
    #[serial]
    fn test_merge_env_rejects_non_numeric() {
        std::env::set_var("COSMO_SINK_BATCH_SIZE", "lots");
        let result = SyncConfig::from_env();
        std::env::remove_var("COSMO_SINK_BATCH_SIZE");
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}

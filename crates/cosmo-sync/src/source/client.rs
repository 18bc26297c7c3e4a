//! HTTP client for the cosmetics registry

use super::types::{CosmeticsQuery, CosmeticsResponse};
use super::RegistryApi;
use crate::config::SyncConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Registry client over `reqwest`
pub struct HttpRegistryApi {
    client: Client,
    api_url: String,
}

impl HttpRegistryApi {
    /// Create a client for `api_url` with a per-request timeout
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(config.api_url.clone(), config.request_timeout())
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl RegistryApi for HttpRegistryApi {
    async fn query(&self, query: &CosmeticsQuery) -> Result<CosmeticsResponse> {
        debug!(
            page = query.page_number,
            max_result = query.max_result,
            code = query.notification_code.as_deref().unwrap_or(""),
            "POST registry query"
        );

        let response = self
            .client
            .post(&self.api_url)
            .json(query)
            .send()
            .await?
            .error_for_status()?;

        // Read as text first so a malformed body maps to a decode error
        // rather than an opaque transport error.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

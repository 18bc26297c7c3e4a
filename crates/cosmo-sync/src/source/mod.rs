//! Registry source access
//!
//! [`RegistryApi`] is one request/response exchange with the registry and
//! nothing more. [`PagedFetcher`] layers the retry policy and the
//! degrade-to-empty behaviour on top of it.

pub mod client;
pub mod fetcher;
pub mod types;

pub use client::HttpRegistryApi;
pub use fetcher::PagedFetcher;
pub use types::{CosmeticsQuery, CosmeticsResponse, ReturnObject};

use crate::error::Result;
use async_trait::async_trait;

/// A single, non-retrying call against the registry search endpoint
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Send one query and decode the envelope
    ///
    /// Transport failures, non-2xx statuses and undecodable bodies are errors.
    async fn query(&self, query: &CosmeticsQuery) -> Result<CosmeticsResponse>;
}

#[async_trait]
impl<T: RegistryApi + ?Sized> RegistryApi for std::sync::Arc<T> {
    async fn query(&self, query: &CosmeticsQuery) -> Result<CosmeticsResponse> {
        (**self).query(query).await
    }
}

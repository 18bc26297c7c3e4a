//! Cosmo Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the cosmetics registry sync tools.
//!
//! # Overview
//!
//! - **Error Handling**: [`CommonError`] and the crate [`Result`] alias
//! - **Logging**: `tracing` subscriber setup with console and daily rolling
//!   file targets (see [`logging`])
//!
//! # Example
//!
//! ```no_run
//! use cosmo_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> cosmo_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};

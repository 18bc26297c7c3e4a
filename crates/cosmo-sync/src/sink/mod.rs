//! Output sinks
//!
//! The sync core talks to its destination through the narrow [`Sink`]
//! contract: open a document, find or create a named view, clear it, size it,
//! write a range, append rows. [`SinkWriter`] builds "replace this view with
//! this table" on top of it, with batching and retry.

pub mod csv_sink;
pub mod grid;
pub mod memory;
pub mod writer;

pub use csv_sink::CsvSink;
pub use grid::{column_letters, header_range, CellRange, Grid};
pub use memory::{MemorySink, SinkOp};
pub use writer::{SinkWriter, WriteSummary};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for sink operations
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Errors raised by a sink
#[derive(Error, Debug)]
pub enum SinkError {
    /// Quota exceeded; the call may succeed after a pause
    #[error("Sink rate limit exceeded: {0}")]
    RateLimited(String),

    /// Transient failure on the sink side
    #[error("Sink server error: {0}")]
    Server(String),

    #[error("Sink authentication failed: {0}")]
    Auth(String),

    /// Document or view does not exist
    #[error("Sink target not found: {0}")]
    NotFound(String),

    #[error("Invalid cell range '{0}'")]
    InvalidRange(String),

    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink error: {0}")]
    Other(String),
}

impl SinkError {
    /// Rate limits and transient server errors are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::RateLimited(_) | SinkError::Server(_))
    }

    /// Short label for summaries
    pub fn kind(&self) -> &'static str {
        match self {
            SinkError::RateLimited(_) => "rate-limited",
            SinkError::Server(_) => "server",
            SinkError::Auth(_) => "auth",
            SinkError::NotFound(_) => "not-found",
            SinkError::InvalidRange(_) => "invalid-range",
            SinkError::Io(_) => "io",
            SinkError::Other(_) => "other",
        }
    }
}

/// Handle to one named view (sheet) inside an opened sink
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewId {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

/// Tabular destination for projected rows
///
/// `open` must be called before any other operation. Row slices are written
/// as-is; a row shorter than the view is padded with empty cells.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Select the document identified by `id`
    async fn open(&self, id: &str) -> SinkResult<()>;

    async fn get_or_create_view(&self, name: &str) -> SinkResult<ViewId>;

    /// Blank every cell; the view keeps its size
    async fn clear(&self, view: &ViewId) -> SinkResult<()>;

    async fn resize(&self, view: &ViewId, rows: usize, cols: usize) -> SinkResult<()>;

    /// Overwrite the cells of an A1 range such as `A1:G1`
    async fn write_range(&self, view: &ViewId, range: &str, rows: &[Vec<String>]) -> SinkResult<()>;

    /// Append after the last non-empty row, growing the view as needed
    async fn append_rows(&self, view: &ViewId, rows: &[Vec<String>]) -> SinkResult<()>;
}

#[async_trait]
impl<T: Sink + ?Sized> Sink for Arc<T> {
    async fn open(&self, id: &str) -> SinkResult<()> {
        (**self).open(id).await
    }

    async fn get_or_create_view(&self, name: &str) -> SinkResult<ViewId> {
        (**self).get_or_create_view(name).await
    }

    async fn clear(&self, view: &ViewId) -> SinkResult<()> {
        (**self).clear(view).await
    }

    async fn resize(&self, view: &ViewId, rows: usize, cols: usize) -> SinkResult<()> {
        (**self).resize(view, rows, cols).await
    }

    async fn write_range(&self, view: &ViewId, range: &str, rows: &[Vec<String>]) -> SinkResult<()> {
        (**self).write_range(view, range, rows).await
    }

    async fn append_rows(&self, view: &ViewId, rows: &[Vec<String>]) -> SinkResult<()> {
        (**self).append_rows(view, rows).await
    }
}

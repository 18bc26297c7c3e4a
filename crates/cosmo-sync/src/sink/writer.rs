//! Replace-view writer
//!
//! Replacing a view takes these sink calls, in order:
//!
//! 1. `get_or_create_view`
//! 2. `clear`
//! 3. `resize` to header + data rows and the header width
//! 4. `write_range` for the header row (`A1:<last column>1`)
//! 5. `append_rows` once per batch, pausing between batches
//!
//! Every call is retried with exponential backoff while the error is
//! retryable (rate limit, server error). Anything else is returned at once.

use super::grid::header_range;
use super::{Sink, SinkResult, ViewId};
use crate::config::SinkConfig;
use crate::projection::Table;
use indicatif::ProgressBar;
use std::future::Future;
use tracing::{debug, info, warn};

/// What one `replace_view` call wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub view: String,
    /// Data rows, header excluded
    pub rows: usize,
    pub columns: usize,
    pub batches: usize,
}

pub struct SinkWriter<'a, S> {
    sink: &'a S,
    config: SinkConfig,
    progress: ProgressBar,
}

impl<'a, S: Sink> SinkWriter<'a, S> {
    pub fn new(sink: &'a S, config: SinkConfig) -> Self {
        Self {
            sink,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Open the sink document, retrying transient failures
    pub async fn open(&self, id: &str) -> SinkResult<()> {
        self.with_backoff("open", id, || self.sink.open(id)).await
    }

    /// Replace the contents of view `name` with `table`
    pub async fn replace_view(&self, name: &str, table: &Table) -> SinkResult<WriteSummary> {
        let sink = self.sink;
        let columns = table.column_count().max(1);
        let data: Vec<Vec<String>> = table.rows.iter().map(|r| r.cells().to_vec()).collect();

        let view: ViewId = self
            .with_backoff("get_or_create_view", name, || sink.get_or_create_view(name))
            .await?;
        debug!(view = %view, "Replacing view contents");

        self.with_backoff("clear", name, || sink.clear(&view)).await?;
        self.with_backoff("resize", name, || sink.resize(&view, data.len() + 1, columns))
            .await?;

        let range = header_range(columns);
        let header = [table.headers.clone()];
        self.with_backoff("write_range", name, || sink.write_range(&view, &range, &header))
            .await?;

        let batch_size = self.config.batch_size.max(1);
        let total_batches = data.len().div_ceil(batch_size);
        self.progress.set_length(data.len() as u64);
        self.progress.set_position(0);

        for (index, batch) in data.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay()).await;
            }

            self.with_backoff("append_rows", name, || sink.append_rows(&view, batch))
                .await?;
            self.progress.inc(batch.len() as u64);
            debug!(
                view = name,
                batch = index + 1,
                total_batches,
                rows = batch.len(),
                "Appended batch"
            );
        }
        self.progress.finish_and_clear();

        info!(view = name, rows = data.len(), columns, batches = total_batches, "View replaced");

        Ok(WriteSummary {
            view: name.to_string(),
            rows: data.len(),
            columns,
            batches: total_batches,
        })
    }

    async fn with_backoff<T, F, Fut>(&self, op: &str, view: &str, mut call: F) -> SinkResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SinkResult<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.backoff_for(attempt);
                    warn!(
                        op,
                        view,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Sink call failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => {
                    if e.is_retryable() {
                        warn!(op, view, attempts = attempt, error = %e, "Sink call failed after retries");
                    }
                    return Err(e);
                },
            }
        }
    }
}

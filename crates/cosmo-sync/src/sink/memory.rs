//! In-process sink
//!
//! Keeps every view as a [`Grid`] behind a mutex. Failures can be queued per
//! operation, which is how the writer's retry behaviour is exercised.

use super::grid::{CellRange, Grid};
use super::{Sink, SinkError, SinkResult, ViewId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Sink operations, for failure injection and the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkOp {
    Open,
    GetOrCreateView,
    Clear,
    Resize,
    WriteRange,
    AppendRows,
}

#[derive(Debug, Default)]
struct MemoryState {
    opened: Option<String>,
    views: Vec<(ViewId, Grid)>,
    failures: HashMap<SinkOp, VecDeque<SinkError>>,
    calls: Vec<SinkOp>,
}

impl MemoryState {
    fn view_mut(&mut self, view: &ViewId) -> SinkResult<&mut Grid> {
        self.views
            .iter_mut()
            .find(|(id, _)| id == view)
            .map(|(_, grid)| grid)
            .ok_or_else(|| SinkError::NotFound(format!("view {view}")))
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with `error`; queued errors fire in order
    pub fn fail_next(&self, op: SinkOp, error: SinkError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Id passed to the last successful `open`
    pub fn opened(&self) -> Option<String> {
        self.lock().opened.clone()
    }

    /// Copy of the named view's grid
    pub fn view(&self, name: &str) -> Option<Grid> {
        self.lock()
            .views
            .iter()
            .find(|(id, _)| id.name == name)
            .map(|(_, grid)| grid.clone())
    }

    pub fn view_names(&self) -> Vec<String> {
        self.lock().views.iter().map(|(id, _)| id.name.clone()).collect()
    }

    /// Every call attempted so far, failed ones included
    pub fn calls(&self) -> Vec<SinkOp> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: SinkOp) -> usize {
        self.lock().calls.iter().filter(|&&c| c == op).count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Log the call, pop an injected failure, and require an open document
    fn begin(&self, op: SinkOp) -> SinkResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls.push(op);

        if let Some(error) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if op != SinkOp::Open && state.opened.is_none() {
            return Err(SinkError::Other("sink used before open".to_string()));
        }

        Ok(state)
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn open(&self, id: &str) -> SinkResult<()> {
        let mut state = self.begin(SinkOp::Open)?;
        if id.trim().is_empty() {
            return Err(SinkError::NotFound("empty sink id".to_string()));
        }
        state.opened = Some(id.to_string());
        Ok(())
    }

    async fn get_or_create_view(&self, name: &str) -> SinkResult<ViewId> {
        let mut state = self.begin(SinkOp::GetOrCreateView)?;

        if let Some((id, _)) = state.views.iter().find(|(id, _)| id.name == name) {
            return Ok(id.clone());
        }

        let id = ViewId {
            id: state.views.len() as u64,
            name: name.to_string(),
        };
        state.views.push((id.clone(), Grid::default()));
        Ok(id)
    }

    async fn clear(&self, view: &ViewId) -> SinkResult<()> {
        let mut state = self.begin(SinkOp::Clear)?;
        state.view_mut(view)?.clear();
        Ok(())
    }

    async fn resize(&self, view: &ViewId, rows: usize, cols: usize) -> SinkResult<()> {
        let mut state = self.begin(SinkOp::Resize)?;
        state.view_mut(view)?.resize(rows, cols);
        Ok(())
    }

    async fn write_range(&self, view: &ViewId, range: &str, rows: &[Vec<String>]) -> SinkResult<()> {
        let mut state = self.begin(SinkOp::WriteRange)?;
        let range = CellRange::parse(range)?;
        state.view_mut(view)?.write_range(&range, rows)
    }

    async fn append_rows(&self, view: &ViewId, rows: &[Vec<String>]) -> SinkResult<()> {
        let mut state = self.begin(SinkOp::AppendRows)?;
        state.view_mut(view)?.append_rows(rows);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_views_are_reused_by_name() {
        let sink = MemorySink::new();
        sink.open("doc").await.unwrap();

        let a = sink.get_or_create_view("A").await.unwrap();
        let b = sink.get_or_create_view("B").await.unwrap();
        let a_again = sink.get_or_create_view("A").await.unwrap();

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(sink.view_names(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_injected_failures_fire_once() {
        let sink = MemorySink::new();
        sink.fail_next(SinkOp::Open, SinkError::Auth("expired".into()));

        assert!(matches!(sink.open("doc").await, Err(SinkError::Auth(_))));
        assert!(sink.open("doc").await.is_ok());
        assert_eq!(sink.call_count(SinkOp::Open), 2);
        assert_eq!(sink.opened().as_deref(), Some("doc"));
    }

    #[tokio::test]
    async fn test_requires_open() {
        let sink = MemorySink::new();
        assert!(sink.get_or_create_view("A").await.is_err());
    }
}

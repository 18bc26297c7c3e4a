//! CSV file sink
//!
//! `open(id)` selects the directory `<root>/<id>`; each view is the file
//! `<view>.csv` inside it. Views are held as grids and the file is rewritten
//! after every change, so a run that aborts midway leaves the last good state.

use super::grid::{CellRange, Grid};
use super::{Sink, SinkError, SinkResult, ViewId};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct CsvState {
    dir: Option<PathBuf>,
    views: Vec<(ViewId, Grid)>,
}

/// Writes each view to its own CSV file
#[derive(Debug)]
pub struct CsvSink {
    root: PathBuf,
    state: Mutex<CsvState>,
}

impl CsvSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Mutex::new(CsvState::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `view` in the opened document
    pub fn view_path(&self, view: &str) -> Option<PathBuf> {
        self.lock().dir.as_ref().map(|dir| dir.join(file_name(view)))
    }

    fn lock(&self) -> MutexGuard<'_, CsvState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `change` to the view's grid, then rewrite its file
    fn update<T>(&self, view: &ViewId, change: impl FnOnce(&mut Grid) -> SinkResult<T>) -> SinkResult<T> {
        let mut state = self.lock();
        let dir = state
            .dir
            .clone()
            .ok_or_else(|| SinkError::Other("sink used before open".to_string()))?;
        let grid = state
            .views
            .iter_mut()
            .find(|(id, _)| id == view)
            .map(|(_, grid)| grid)
            .ok_or_else(|| SinkError::NotFound(format!("view {view}")))?;

        let out = change(grid)?;
        write_grid(&dir.join(file_name(&view.name)), grid)?;
        Ok(out)
    }
}

/// View names become file names; path separators are replaced
fn file_name(view: &str) -> String {
    let safe: String = view
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{safe}.csv")
}

fn csv_error(err: csv::Error) -> SinkError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return SinkError::Io(io);
        }
        return SinkError::Other("CSV I/O failure".to_string());
    }
    SinkError::Other(format!("CSV: {err}"))
}

fn read_grid(path: &Path) -> SinkResult<Grid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Grid::from_rows(rows))
}

fn write_grid(path: &Path, grid: &Grid) -> SinkResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_error)?;

    for row in grid.used() {
        writer.write_record(row).map_err(csv_error)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = grid.used_rows(), "Wrote CSV view");
    Ok(())
}

#[async_trait]
impl Sink for CsvSink {
    async fn open(&self, id: &str) -> SinkResult<()> {
        let id = id.trim();
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(SinkError::NotFound(format!("invalid sink id '{id}'")));
        }

        let dir = self.root.join(id);
        std::fs::create_dir_all(&dir)?;

        let mut state = self.lock();
        state.dir = Some(dir);
        state.views.clear();
        Ok(())
    }

    async fn get_or_create_view(&self, name: &str) -> SinkResult<ViewId> {
        let mut state = self.lock();
        let dir = state
            .dir
            .clone()
            .ok_or_else(|| SinkError::Other("sink used before open".to_string()))?;

        if let Some((id, _)) = state.views.iter().find(|(id, _)| id.name == name) {
            return Ok(id.clone());
        }

        let path = dir.join(file_name(name));
        let grid = if path.exists() {
            read_grid(&path)?
        } else {
            let grid = Grid::default();
            write_grid(&path, &grid)?;
            grid
        };

        let id = ViewId {
            id: state.views.len() as u64,
            name: name.to_string(),
        };
        state.views.push((id.clone(), grid));
        Ok(id)
    }

    async fn clear(&self, view: &ViewId) -> SinkResult<()> {
        self.update(view, |grid| {
            grid.clear();
            Ok(())
        })
    }

    async fn resize(&self, view: &ViewId, rows: usize, cols: usize) -> SinkResult<()> {
        self.update(view, |grid| {
            grid.resize(rows, cols);
            Ok(())
        })
    }

    async fn write_range(&self, view: &ViewId, range: &str, rows: &[Vec<String>]) -> SinkResult<()> {
        let range = CellRange::parse(range)?;
        self.update(view, |grid| grid.write_range(&range, rows))
    }

    async fn append_rows(&self, view: &ViewId, rows: &[Vec<String>]) -> SinkResult<()> {
        self.update(view, |grid| {
            grid.append_rows(rows);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_writes_one_file_per_view() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());
        sink.open("sheet-123").await.unwrap();

        let view = sink.get_or_create_view("Sheet1_Filtered").await.unwrap();
        sink.write_range(&view, "A1:B1", &[row(&["code", "name"])]).await.unwrap();
        sink.append_rows(&view, &[row(&["N1", "Cream, night"])]).await.unwrap();

        let path = dir.path().join("sheet-123").join("Sheet1_Filtered.csv");
        assert_eq!(sink.view_path("Sheet1_Filtered").unwrap(), path);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "code,name\nN1,\"Cream, night\"\n");
    }

    #[tokio::test]
    async fn test_existing_file_is_loaded_and_cleared() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("doc")).unwrap();
        std::fs::write(dir.path().join("doc").join("View.csv"), "a,b\nc,d\n").unwrap();

        let sink = CsvSink::new(dir.path());
        sink.open("doc").await.unwrap();
        let view = sink.get_or_create_view("View").await.unwrap();

        sink.append_rows(&view, &[row(&["e", "f"])]).await.unwrap();
        let text = std::fs::read_to_string(dir.path().join("doc").join("View.csv")).unwrap();
        assert_eq!(text, "a,b\nc,d\ne,f\n");

        sink.clear(&view).await.unwrap();
        let text = std::fs::read_to_string(dir.path().join("doc").join("View.csv")).unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());

        assert!(matches!(sink.open("../escape").await, Err(SinkError::NotFound(_))));
        assert!(matches!(sink.open("  ").await, Err(SinkError::NotFound(_))));
    }
}

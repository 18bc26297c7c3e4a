//! Record projection
//!
//! Two independent projections over a [`Dataset`](crate::model::Dataset):
//!
//! - [`project_filtered`]: the fixed seven-column summary
//! - [`project_full`]: every field flattened into columns, with packages
//!   rendered as text and shades expanded one row per shade
//!
//! Both produce a [`Table`] that is written once and never mutated.

pub mod filtered;
pub mod flatten;
pub mod full;

pub use filtered::{project_filtered, FILTERED_COLUMNS};
pub use flatten::{flatten_record, format_packages, FieldValue, FlatRecord};
pub use full::{project_full, BASE_COLUMNS, SHADES_COLUMN, SHADE_ROW_COLUMN};

/// Delimiter joining packages and shades inside one cell
pub const CELL_DELIMITER: &str = " | ";

/// One output row; cells line up with the table headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow(Vec<String>);

impl ProjectedRow {
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_cells(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for ProjectedRow {
    fn from(cells: Vec<String>) -> Self {
        Self(cells)
    }
}

/// Header plus rows, ready for a sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<ProjectedRow>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

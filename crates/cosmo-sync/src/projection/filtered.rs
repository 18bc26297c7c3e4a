//! Seven-column summary projection

use super::{ProjectedRow, Table};
use crate::model::{Dataset, Record};

/// Output columns, in order
pub const FILTERED_COLUMNS: [&str; 7] = [
    "nameCosmeticHeb",
    "nameCosmeticEng",
    "notificationCode",
    "importTrack",
    "rpCorporation",
    "manufacturer",
    "importer",
];

/// One row per record; absent fields become empty cells
pub fn project_filtered(dataset: &Dataset) -> Table {
    Table {
        headers: FILTERED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: dataset.iter().map(filtered_row).collect(),
    }
}

fn filtered_row(record: &Record) -> ProjectedRow {
    FILTERED_COLUMNS
        .iter()
        .map(|column| record.text(column))
        .collect::<Vec<_>>()
        .into()
}

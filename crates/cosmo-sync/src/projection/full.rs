//! All-columns projection with shade expansion

use super::flatten::{flatten_record, FlatRecord};
use super::{ProjectedRow, Table, CELL_DELIMITER};
use crate::model::{Dataset, Record};

/// Columns that always lead the header, in order
pub const BASE_COLUMNS: [&str; 5] = [
    "notificationCode",
    "importTrack",
    "rpCorporation",
    "manufacturer",
    "importer",
];

/// All shade names of a record, on its primary row
pub const SHADES_COLUMN: &str = "shades";

/// One shade name per expanded row
pub const SHADE_ROW_COLUMN: &str = "shades2";

/// Flatten every record into the shared header
///
/// The header is [`BASE_COLUMNS`], then the remaining columns of the first
/// record in their order, then `shades` and `shades2` unless already present.
/// Columns that only later records carry are not added.
///
/// A record with N named shades yields N + 1 rows: a primary row with every
/// shade in `shades`, then one row per shade with only `shades2` differing.
pub fn project_full(dataset: &Dataset) -> Table {
    let flattened: Vec<(FlatRecord, &Record)> = dataset.iter().map(|r| (flatten_record(r), r)).collect();
    let headers = full_headers(flattened.first().map(|(flat, _)| flat));

    let mut rows = Vec::with_capacity(flattened.len());
    for (flat, record) in &flattened {
        let shade_names: Vec<String> = record.shades().into_iter().map(|s| s.name).collect();

        if shade_names.is_empty() {
            rows.push(build_row(&headers, flat, "", ""));
            continue;
        }

        rows.push(build_row(&headers, flat, &shade_names.join(CELL_DELIMITER), ""));
        for name in &shade_names {
            rows.push(build_row(&headers, flat, "", name));
        }
    }

    Table { headers, rows }
}

fn full_headers(first: Option<&FlatRecord>) -> Vec<String> {
    let mut headers: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();

    if let Some(first) = first {
        headers.extend(
            first
                .column_names()
                .filter(|name| !BASE_COLUMNS.contains(name))
                .map(str::to_string),
        );
    }

    for column in [SHADES_COLUMN, SHADE_ROW_COLUMN] {
        if !headers.iter().any(|h| h == column) {
            headers.push(column.to_string());
        }
    }

    headers
}

fn build_row(headers: &[String], flat: &FlatRecord, shades: &str, shade: &str) -> ProjectedRow {
    headers
        .iter()
        .map(|header| match header.as_str() {
            SHADES_COLUMN => shades.to_string(),
            SHADE_ROW_COLUMN => shade.to_string(),
            other => flat.cell(other),
        })
        .collect::<Vec<_>>()
        .into()
}

//! In-process cell grid and A1 range notation
//!
//! Shared by the memory and CSV sinks so both follow the same spreadsheet
//! semantics: `clear` keeps the size, `write_range` grows the grid when the
//! range reaches past it, `append_rows` starts after the last non-empty row.

use super::{SinkError, SinkResult};
use std::fmt;

/// Column letters for a zero-based index: 0 is `A`, 25 is `Z`, 26 is `AA`
pub fn column_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Range covering the header row of a `cols`-wide table, e.g. `A1:G1`
pub fn header_range(cols: usize) -> String {
    format!("A1:{}1", column_letters(cols.max(1) - 1))
}

/// A parsed A1 range; row and column indices are zero-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    /// `None` for a single-cell anchor such as `B3`
    pub end: Option<(usize, usize)>,
}

impl CellRange {
    /// Parse `A1`, `A1:G1` or `View!A1:G1`
    pub fn parse(text: &str) -> SinkResult<Self> {
        let cells = text.rsplit_once('!').map_or(text, |(_, cells)| cells);
        let invalid = || SinkError::InvalidRange(text.to_string());

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };

        let (start_row, start_col) = parse_cell(start).ok_or_else(invalid)?;
        let end = match end {
            Some(end) => {
                let (row, col) = parse_cell(end).ok_or_else(invalid)?;
                if row < start_row || col < start_col {
                    return Err(invalid());
                }
                Some((row, col))
            },
            None => None,
        };

        Ok(Self {
            start_row,
            start_col,
            end,
        })
    }

    /// Rows and columns the range spans, if bounded
    pub fn extent(&self) -> Option<(usize, usize)> {
        self.end
            .map(|(row, col)| (row - self.start_row + 1, col - self.start_col + 1))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.start_col), self.start_row + 1)?;
        if let Some((row, col)) = self.end {
            write!(f, ":{}{}", column_letters(col), row + 1)?;
        }
        Ok(())
    }
}

/// `B12` to zero-based (11, 1)
fn parse_cell(cell: &str) -> Option<(usize, usize)> {
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut col = 0usize;
    for c in letters.chars() {
        let value = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        col = col.checked_mul(26)?.checked_add(value)?;
    }

    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }

    Some((row - 1, col - 1))
}

/// Rectangular grid of cell text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Vec<String>>,
    cols: usize,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![vec![String::new(); cols]; rows],
            cols,
        }
    }

    /// Grid holding `rows`, as wide as the widest one
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self { cells: rows, cols };
        grid.pad_rows();
        grid
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(row)?.get(col).map(String::as_str)
    }

    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.cells.get(row).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        for row in &mut self.cells {
            for cell in row.iter_mut() {
                cell.clear();
            }
        }
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.cols = cols;
        self.cells.resize_with(rows, Vec::new);
        self.pad_rows();
        for row in &mut self.cells {
            row.truncate(cols);
        }
    }

    /// Write `rows` into `range`, growing the grid if the range reaches past it
    pub fn write_range(&mut self, range: &CellRange, rows: &[Vec<String>]) -> SinkResult<()> {
        if let Some((max_rows, max_cols)) = range.extent() {
            if rows.len() > max_rows || rows.iter().any(|r| r.len() > max_cols) {
                return Err(SinkError::InvalidRange(format!(
                    "{} cannot hold {} row(s) of data",
                    range,
                    rows.len()
                )));
            }
        }

        self.put(range.start_row, range.start_col, rows);
        Ok(())
    }

    /// Append below the last non-empty row
    pub fn append_rows(&mut self, rows: &[Vec<String>]) {
        let start = self.used_rows();
        self.put(start, 0, rows);
    }

    /// Rows up to and including the last one with any content
    pub fn used_rows(&self) -> usize {
        self.cells
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
            .map_or(0, |last| last + 1)
    }

    /// The used rows, for export
    pub fn used(&self) -> &[Vec<String>] {
        &self.cells[..self.used_rows()]
    }

    fn put(&mut self, start_row: usize, start_col: usize, rows: &[Vec<String>]) {
        let needed_rows = start_row + rows.len();
        let needed_cols = rows
            .iter()
            .map(|r| start_col + r.len())
            .max()
            .unwrap_or(0)
            .max(self.cols);

        if needed_rows > self.cells.len() {
            self.cells.resize_with(needed_rows, Vec::new);
        }
        self.cols = needed_cols;
        self.pad_rows();

        for (offset, values) in rows.iter().enumerate() {
            let target = &mut self.cells[start_row + offset];
            for (col, value) in values.iter().enumerate() {
                target[start_col + col].clone_from(value);
            }
        }
    }

    fn pad_rows(&mut self) {
        let cols = self.cols;
        for row in &mut self.cells {
            if row.len() < cols {
                row.resize(cols, String::new());
            }
        }
    }
}

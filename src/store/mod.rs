//! Record store: immutable, row-oriented tables loaded from the data directory.
//!
//! - **Cell / Row / Table**: the in-memory shape every dataset shares
//! - **loader**: CSV / JSON / JSONL parsing into a [`Table`]
//! - **catalog**: the known datasets, their file stems and required columns
//! - **cache**: load-once-per-process access keyed by file identity

pub mod cache;
pub mod catalog;
pub mod loader;

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};

pub use cache::TableCache;
pub use catalog::DatasetId;

/// Column names treated as carrying a year: `year`, `day`, `date`, or any
/// name ending in `_year` / `_date`.
static YEAR_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:year|day|date)$|_(?:year|date)$").expect("year-like regex must compile")
});

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Cell {
    /// Numeric view of the cell. Dates and text are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Calendar year carried by the cell: the integer part of a number, or
    /// the year of a date.
    pub fn year(&self) -> Option<i32> {
        match self {
            Self::Number(n) if n.is_finite() => Some(n.trunc() as i32),
            Self::Date(d) => Some(d.year()),
            _ => None,
        }
    }

    /// Grouping key for the cell. `Null` has no key.
    pub fn key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One record. Cells are aligned with the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&Cell::Null)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An immutable table of named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from raw records. Short records are padded with `Null`,
    /// long ones are cut to the column count.
    pub fn from_records<S: AsRef<str>>(
        name: impl Into<String>,
        columns: &[S],
        records: Vec<Vec<Cell>>,
    ) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let width = columns.len();
        let rows = records
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, Cell::Null);
                Row { cells }
            })
            .collect();

        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c == field)
    }

    /// Position of `field`, or `SchemaMismatch` naming it.
    pub fn column_index(&self, field: &str) -> EngineResult<usize> {
        self.columns
            .iter()
            .position(|c| c == field)
            .ok_or_else(|| EngineError::missing_field(field))
    }

    /// Check that every field in `fields` exists. Reports the first missing one.
    pub fn require_columns(&self, fields: &[&str]) -> EngineResult<()> {
        for field in fields {
            self.column_index(field)?;
        }
        Ok(())
    }

    /// The cell of `row` under `field`.
    pub fn value<'a>(&self, row: &'a Row, field: &str) -> EngineResult<&'a Cell> {
        let idx = self.column_index(field)?;
        Ok(row.cell(idx))
    }

    /// First column whose name looks like it carries a year.
    pub fn year_like_field(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| YEAR_LIKE_RE.is_match(&c.to_ascii_lowercase()))
            .map(String::as_str)
    }

    /// Distinct years present in `year_field`, ascending.
    pub fn years(&self, year_field: &str) -> EngineResult<Vec<i32>> {
        let idx = self.column_index(year_field)?;
        let mut years: Vec<i32> = self.rows.iter().filter_map(|r| r.cell(idx).year()).collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    /// Derived table holding the rows that satisfy `keep`.
    pub fn filter(&self, mut keep: impl FnMut(&Row) -> bool) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Derived table restricted to `start <= year <= end` on `year_field`.
    /// Rows without a readable year are dropped.
    pub fn filter_years(&self, year_field: &str, start: i32, end: i32) -> EngineResult<Table> {
        let idx = self.column_index(year_field)?;
        Ok(self.filter(|row| {
            row.cell(idx)
                .year()
                .is_some_and(|y| (start..=end).contains(&y))
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

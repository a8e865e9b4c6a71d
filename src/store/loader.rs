//! File loaders: CSV, JSON (array of objects) and JSONL (object per line).
//!
//! All three produce the same [`Table`] shape. Cell types are inferred from
//! the raw text so that a CSV export and a JSON export of the same dataset
//! load identically.

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use super::{Cell, Table};
use crate::error::{EngineError, EngineResult};

/// Leading ISO date, optionally followed by a time part (`2023-05-01`,
/// `2023-05-01T00:00:00`, `2023-05-01 00:00:00`).
static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T ][0-9:.+\-Z]*)?$").expect("date regex must compile")
});

/// Supported on-disk formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
    JsonLines,
}

impl FileFormat {
    pub const EXTENSIONS: [&'static str; 3] = ["csv", "json", "jsonl"];

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Infer a cell from raw text.
pub fn parse_cell(raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() || matches!(s, "NA" | "N/A" | "NaN" | "nan" | "null" | "None") {
        return Cell::Null;
    }
    if let Ok(n) = s.parse::<f64>()
        && n.is_finite()
    {
        return Cell::Number(n);
    }
    if let Some(caps) = ISO_DATE_RE.captures(s)
        && let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
    {
        return Cell::Date(date);
    }
    Cell::Text(s.to_string())
}

/// Load the file at `path` into a table called `name`.
pub fn read_table(path: &Path, name: &str) -> EngineResult<Table> {
    let format = FileFormat::from_path(path)
        .ok_or_else(|| EngineError::load(path, "unsupported file extension"))?;

    match format {
        FileFormat::Csv => read_csv(path, name),
        FileFormat::Json => {
            let content =
                fs::read_to_string(path).map_err(|e| EngineError::load(path, e.to_string()))?;
            parse_json(&content, name).map_err(|e| relocate(e, path))
        }
        FileFormat::JsonLines => read_jsonl(path, name),
    }
}

fn read_csv(path: &Path, name: &str) -> EngineResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| EngineError::load(path, e.to_string()))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::load(path, e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::load(path, e.to_string()))?;
        records.push(record.iter().map(parse_cell).collect());
    }

    Ok(Table::from_records(name, &columns, records))
}

fn read_jsonl(path: &Path, name: &str) -> EngineResult<Table> {
    let file = fs::File::open(path).map_err(|e| EngineError::load(path, e.to_string()))?;
    let mut objects = Vec::new();

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| EngineError::load(path, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .map_err(|e| EngineError::load(path, format!("line {}: {e}", lineno + 1)))?;
        match value {
            Value::Object(map) => objects.push(map),
            _ => {
                return Err(EngineError::load(
                    path,
                    format!("line {}: expected a JSON object", lineno + 1),
                ));
            }
        }
    }

    Ok(table_from_objects(name, objects))
}

/// Parse a JSON array of objects into a table.
pub fn parse_json(content: &str, name: &str) -> EngineResult<Table> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| EngineError::load(name, e.to_string()))?;

    let Value::Array(items) = value else {
        return Err(EngineError::load(name, "expected a JSON array of objects"));
    };

    let mut objects = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => objects.push(map),
            _ => return Err(EngineError::load(name, "array element is not an object")),
        }
    }

    Ok(table_from_objects(name, objects))
}

fn table_from_objects(name: &str, objects: Vec<Map<String, Value>>) -> Table {
    // Union of keys across records, in first-seen order.
    let mut columns: Vec<String> = Vec::new();
    let mut seen = BTreeSet::new();
    for obj in &objects {
        for key in obj.keys() {
            if seen.insert(key.clone()) {
                columns.push(key.clone());
            }
        }
    }

    let records = objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(json_cell).unwrap_or(Cell::Null))
                .collect()
        })
        .collect();

    Table::from_records(name, &columns, records)
}

fn json_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
        Value::String(s) => parse_cell(s),
        Value::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

fn relocate(err: EngineError, path: &Path) -> EngineError {
    match err {
        EngineError::Load { message, .. } => EngineError::load(path, message),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cell_infers_types() {
        assert_eq!(parse_cell("42"), Cell::Number(42.0));
        assert_eq!(parse_cell(" 1.5e7 "), Cell::Number(1.5e7));
        assert_eq!(parse_cell(""), Cell::Null);
        assert_eq!(parse_cell("NA"), Cell::Null);
        assert_eq!(
            parse_cell("2023-03-14"),
            Cell::Date(NaiveDate::from_ymd_opt(2023, 3, 14).unwrap())
        );
        assert_eq!(
            parse_cell("2023-03-14T00:00:00"),
            Cell::Date(NaiveDate::from_ymd_opt(2023, 3, 14).unwrap())
        );
        assert_eq!(parse_cell("Language"), Cell::Text("Language".into()));
    }

    #[test]
    fn parse_cell_rejects_invalid_dates_as_text() {
        assert_eq!(parse_cell("2023-13-40"), Cell::Text("2023-13-40".into()));
    }

    #[test]
    fn parse_json_collects_union_of_keys() {
        let json = r#"[
            {"entity": "GPT-4", "day": "2023-03-15", "cost": 4.0e7},
            {"entity": "Gemini", "cost": 1.9e8, "domain": "Multimodal"}
        ]"#;
        let table = parse_json(json, "cost").unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.has_column("domain"));
        let second = &table.rows()[1];
        assert!(table.value(second, "day").unwrap().is_null());
    }

    #[test]
    fn parse_json_rejects_non_arrays() {
        assert!(parse_json(r#"{"a": 1}"#, "x").is_err());
        assert!(parse_json(r#"[1, 2]"#, "x").is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.csv")), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_path(Path::new("a.JSON")), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_path(Path::new("a.jsonl")), Some(FileFormat::JsonLines));
        assert_eq!(FileFormat::from_path(Path::new("a.parquet")), None);
    }
}

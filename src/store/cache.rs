//! Load-once table cache.
//!
//! A file is read at most once per process. Entries are keyed by the
//! canonical path of the file, so two spellings of the same path share one
//! table. Tables are handed out as `Arc<Table>` and never mutated.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::catalog::{self, DatasetId};
use super::{Table, loader};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Default)]
pub struct TableCache {
    dir: PathBuf,
    by_path: HashMap<PathBuf, Arc<Table>>,
    by_dataset: HashMap<DatasetId, Arc<Table>>,
    reads: usize,
}

/// Availability of one catalog dataset, for `horizon datasets` and the API.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatus {
    pub dataset: DatasetId,
    pub title: &'static str,
    pub path: Option<PathBuf>,
    pub rows: Option<usize>,
    pub error: Option<String>,
    /// Categorical values no known category matches, as `field: label`.
    pub unknown_labels: Vec<String>,
}

impl TableCache {
    /// Cache over the data directory `dir`. Nothing is read until a table is
    /// requested.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of files actually read from disk so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Register an in-memory table for `id`, bypassing the data directory.
    pub fn insert(&mut self, id: DatasetId, table: Table) {
        self.by_dataset.insert(id, Arc::new(table));
    }

    /// The table for a catalog dataset, loading and schema-checking it on
    /// first use.
    pub fn dataset(&mut self, id: DatasetId) -> EngineResult<Arc<Table>> {
        if let Some(table) = self.by_dataset.get(&id) {
            return Ok(Arc::clone(table));
        }

        let path = id.locate(&self.dir).ok_or_else(|| EngineError::DatasetNotFound {
            dataset: id.file_stem().to_string(),
            dir: self.dir.clone(),
        })?;

        let table = self.load_path(&path, id.file_stem())?;
        id.check(&table)?;
        self.by_dataset.insert(id, Arc::clone(&table));
        Ok(table)
    }

    /// Load an arbitrary file, returning the cached table when the same file
    /// was loaded before.
    pub fn load_path(&mut self, path: &Path, name: &str) -> EngineResult<Arc<Table>> {
        let identity = fs::canonicalize(path).map_err(|e| EngineError::load(path, e.to_string()))?;

        if let Some(table) = self.by_path.get(&identity) {
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(loader::read_table(&identity, name)?);
        self.reads += 1;
        self.by_path.insert(identity, Arc::clone(&table));
        Ok(table)
    }

    /// Try every catalog dataset and report what is available.
    pub fn status(&mut self) -> Vec<DatasetStatus> {
        DatasetId::ALL
            .iter()
            .map(|&id| {
                let path = id.locate(&self.dir);
                match self.dataset(id) {
                    Ok(table) => DatasetStatus {
                        dataset: id,
                        title: id.title(),
                        path,
                        rows: Some(table.len()),
                        error: None,
                        unknown_labels: unrecognised(id, &table),
                    },
                    Err(e) => DatasetStatus {
                        dataset: id,
                        title: id.title(),
                        path,
                        rows: None,
                        error: Some(e.to_string()),
                        unknown_labels: Vec::new(),
                    },
                }
            })
            .collect()
    }
}

/// Unknown categorical labels across the dataset's label columns.
fn unrecognised(id: DatasetId, table: &Table) -> Vec<String> {
    let mut out = Vec::new();
    for &field in id.label_columns() {
        // Label columns are required, so the lookup only fails on a bad file.
        if let Ok(labels) = catalog::unknown_labels(table, field) {
            out.extend(labels.into_iter().map(|l| format!("{field}: {l}")));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Cell;

    #[test]
    fn inserted_tables_are_served_without_reading() {
        let mut cache = TableCache::new("/nonexistent");
        cache.insert(
            DatasetId::PatentsByCountry,
            Table::from_records(
                "patents_by_country",
                &["entity", "num_patent_applications"],
                vec![vec![Cell::from("China"), Cell::from(29853.0)]],
            ),
        );
        let table = cache.dataset(DatasetId::PatentsByCountry).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(cache.reads(), 0);
    }

    #[test]
    fn missing_dataset_is_reported() {
        let mut cache = TableCache::new("/nonexistent");
        let err = cache.dataset(DatasetId::TrainingCost).unwrap_err();
        assert!(matches!(err, EngineError::DatasetNotFound { .. }));
    }
}

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::HorizonConfig;
use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// Activity entry (JSONL)
// ---------------------------------------------------------------------------

/// One engine invocation, as recorded in `~/.horizon/activity.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    /// What ran: `"kpis"`, `"compare"`, `"concentration"`, `"volatility"`, ...
    pub action: String,
    /// Selection details, e.g. `"domain/training-cost 2018-2024"`.
    #[serde(default)]
    pub detail: String,
    /// Caller surface: `"cli"` or `"web"`.
    #[serde(default)]
    pub source: String,
    /// `"ok"` or the engine error kind.
    pub outcome: String,
    pub duration_ms: u64,
}

impl ActivityEntry {
    pub fn is_ok(&self) -> bool {
        self.outcome == "ok"
    }
}

// ---------------------------------------------------------------------------
// Log handle
// ---------------------------------------------------------------------------

/// Handle on the activity log. A disabled log records nothing and reads
/// nothing.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn from_config(config: &HorizonConfig) -> Self {
        Self {
            path: config
                .logging
                .enabled
                .then(|| config.activity_log_path()),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Run `f`, then record its action, outcome and wall-clock duration.
    ///
    /// Best-effort: logging failures never affect the result.
    pub fn track<T>(
        &self,
        action: &str,
        detail: &str,
        source: &str,
        f: impl FnOnce() -> EngineResult<T>,
    ) -> EngineResult<T> {
        let started = Instant::now();
        let result = f();
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };

        let entry = ActivityEntry {
            timestamp: Utc::now().to_rfc3339(),
            action: action.to_string(),
            detail: detail.to_string(),
            source: source.to_string(),
            outcome: outcome.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        let _ = self.append(&entry);

        result
    }

    /// Append one entry. Does nothing when the log is disabled.
    pub fn append(&self, entry: &ActivityEntry) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;

        Ok(())
    }

    /// Read all entries. Malformed lines are skipped; a missing file reads
    /// as empty.
    pub fn read_all(&self) -> Vec<ActivityEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };

        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<ActivityEntry>(&line).ok())
            .collect()
    }

    /// Entries from the last `days` days, or all entries when `None`.
    pub fn read_since_days(&self, days: Option<u32>) -> Vec<ActivityEntry> {
        let entries = self.read_all();

        let Some(days) = days else {
            return entries;
        };

        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
        entries
            .into_iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn track_records_outcome_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::at(dir.path().join("activity.jsonl"));

        let ok = log.track("compare", "domain/training-cost", "cli", || Ok(3));
        assert_eq!(ok.unwrap(), 3);
        let err: EngineResult<()> = log.track("kpis", "investment", "web", || {
            Err(EngineError::MissingYear { year: 2022 })
        });
        assert!(err.is_err());

        let entries = log.read_all();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_ok());
        assert_eq!(entries[1].outcome, "missing_year");
        assert_eq!(entries[1].source, "web");
    }

    #[test]
    fn disabled_log_is_silent() {
        let log = ActivityLog::disabled();
        let _ = log.track("kpis", "", "cli", || Ok(()));
        assert!(log.read_all().is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let good = concat!(
            r#"{"timestamp":"2025-01-01T00:00:00+00:00","#,
            r#""action":"kpis","outcome":"ok","duration_ms":2}"#
        );
        fs::write(&path, format!("not json\n{good}\n"))
        .unwrap();
        let entries = ActivityLog::at(&path).read_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].detail, "");
    }
}

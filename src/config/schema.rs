/// Configuration schema and defaults for horizon.
///
/// Sections: `[data]`, `[comparison]`, `[concentration]`, `[web]` and
/// `[logging]`. Every field has a built-in default; users only set what they
/// want to override.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level horizon configuration.
///
/// Maps directly to `~/.horizon/config.toml` and `.horizon.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    pub data: DataConfig,
    pub comparison: ComparisonConfig,
    pub concentration: ConcentrationConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [data]
// ---------------------------------------------------------------------------

/// Where the dataset files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding one `.csv` / `.json` / `.jsonl` file per dataset.
    /// `~` is expanded to the home directory.
    pub dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: "./data".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [comparison]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Lower bound of the default year range. The upper bound is always the
    /// latest year in the selected data.
    pub default_start_year: i32,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            default_start_year: 2018,
        }
    }
}

// ---------------------------------------------------------------------------
// [concentration]
// ---------------------------------------------------------------------------

/// Regions contributing to the investment concentration index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcentrationConfig {
    /// Column names of the wide investment table used as shares.
    pub regions: Vec<String>,
    /// Column labelling each row (one index value per label).
    pub key_field: String,
}

impl Default for ConcentrationConfig {
    fn default() -> Self {
        Self {
            regions: vec![
                "china".to_string(),
                "united_states".to_string(),
                "european_union_and_united_kingdom".to_string(),
            ],
            key_field: "year".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `horizon web`.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8501".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether engine invocations are appended to the activity log.
    pub enabled: bool,
    /// Path to the activity log file. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.horizon/activity.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

impl HorizonConfig {
    /// Resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.data.dir)
    }

    /// Resolved activity log path.
    pub fn activity_log_path(&self) -> PathBuf {
        expand_home(&self.logging.path)
    }

    /// The annotated default config written by `horizon config init`.
    pub fn default_toml() -> String {
        r#"# horizon Configuration
# AI Horizon Scanner metrics engine
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (HORIZON_*)
#   2. Project config (.horizon.toml in current directory)
#   3. User global config (~/.horizon/config.toml)
#   4. Built-in defaults

[data]
dir = "./data"                # one <dataset>.csv | .json | .jsonl per table

[comparison]
default_start_year = 2018     # upper bound is the latest year in the data

[concentration]
# Columns of investment_by_region used as shares in the concentration index
regions = ["china", "united_states", "european_union_and_united_kingdom"]
key_field = "year"

[web]
addr = "127.0.0.1:8501"
open_browser = true

[logging]
enabled = true
path = "~/.horizon/activity.jsonl"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HorizonConfig::default();
        assert_eq!(config.data.dir, "./data");
        assert_eq!(config.comparison.default_start_year, 2018);
        assert_eq!(config.concentration.regions.len(), 3);
        assert!(config.logging.enabled);
    }

    #[test]
    fn default_toml_parses_back() {
        let toml_str = HorizonConfig::default_toml();
        let config: HorizonConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.web.addr, "127.0.0.1:8501");
        assert_eq!(
            config.concentration.regions,
            HorizonConfig::default().concentration.regions
        );
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: HorizonConfig = toml::from_str(
            r#"
[concentration]
regions = ["china", "india"]
"#,
        )
        .unwrap();
        assert_eq!(config.concentration.regions, vec!["china", "india"]);
        assert_eq!(config.concentration.key_field, "year");
        assert_eq!(config.comparison.default_start_year, 2018);
    }

    #[test]
    fn expand_home_leaves_relative_paths() {
        assert_eq!(expand_home("./data"), PathBuf::from("./data"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x.jsonl"), home.join("x.jsonl"));
        }
    }
}

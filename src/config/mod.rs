/// Configuration system for horizon.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::HorizonConfig::default()`]
/// 2. **User global config**: `~/.horizon/config.toml`
/// 3. **Project local config**: `.horizon.toml` in the current working directory
/// 4. **Environment variables**: `HORIZON_*` overrides (highest precedence)
///
/// Missing sections in a TOML file fall back to built-in defaults.
///
/// # Usage
///
/// ```rust,ignore
/// use horizon::config;
///
/// let cfg = config::load();
/// let cache = horizon::store::TableCache::new(cfg.data_dir());
/// ```
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::HorizonConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved horizon configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> HorizonConfig {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in [global_config_path(), project_config_path()] {
        if let Some(layer) = load_toml_file(path) {
            merge_values(&mut merged, layer);
        }
    }

    let mut config: HorizonConfig = merged.try_into().unwrap_or_default();
    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is malformed. A broken config file falls back to the layers below
/// it.
fn load_toml_file(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    // Reject files the schema cannot read at all.
    value.clone().try_into::<HorizonConfig>().ok()?;
    Some(value)
}

/// Deep-merge `overlay` into `base`: tables merge key by key, everything
/// else is replaced.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.horizon/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".horizon").join("config.toml"))
}

/// Path to the project local config: `.horizon.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".horizon.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `HORIZON_DATA_DIR`: dataset directory
/// - `HORIZON_START_YEAR`: default lower bound of the comparison year range
/// - `HORIZON_REGIONS`: comma-separated concentration regions
/// - `HORIZON_WEB_ADDR`: dashboard listen address
/// - `HORIZON_LOGGING`: activity log on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut HorizonConfig) {
    if let Ok(val) = std::env::var("HORIZON_DATA_DIR")
        && !val.is_empty()
    {
        config.data.dir = val;
    }
    if let Ok(val) = std::env::var("HORIZON_START_YEAR")
        && let Ok(year) = val.trim().parse::<i32>()
    {
        config.comparison.default_start_year = year;
    }
    if let Ok(val) = std::env::var("HORIZON_REGIONS")
        && let Some(regions) = parse_list(&val)
    {
        config.concentration.regions = regions;
    }
    if let Ok(val) = std::env::var("HORIZON_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Ok(val) = std::env::var("HORIZON_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a comma-separated list, dropping blanks. `None` if nothing remains.
fn parse_list(val: &str) -> Option<Vec<String>> {
    let items: Vec<String> = val
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.horizon/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.horizon/ directory")?;
    }

    fs::write(&path, HorizonConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `data.dir` or `concentration.regions`. When no
/// global file exists yet, the defaults are written out first.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&HorizonConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut value_table, key, value)?;

    // Refuse to write something the loader would silently discard.
    let rendered =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;
    toml::from_str::<HorizonConfig>(&rendered)
        .with_context(|| format!("'{value}' is not a valid value for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, rendered).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("empty config key segment in '{key}'");
    }

    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let existing = table
        .get(leaf)
        .with_context(|| format!("unknown config key '{key}'"))?;

    let new_value = match existing {
        toml::Value::Boolean(_) => toml::Value::Boolean(is_truthy(raw_value)),
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        toml::Value::Float(_) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        toml::Value::Array(_) => {
            let items = parse_list(raw_value)
                .unwrap_or_default()
                .into_iter()
                .map(toml::Value::String)
                .collect();
            toml::Value::Array(items)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

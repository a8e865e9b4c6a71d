//! CLI command implementations for horizon.
//!
//! Provides subcommand handlers for:
//! - `horizon overview`: sections, weekly spotlight, dataset availability
//! - `horizon kpis <section>`: KPI panel of one dashboard section
//! - `horizon compare`: grouped comparison with CSV export
//! - `horizon concentration` / `horizon volatility`: investment rankings
//! - `horizon datasets`: catalog and load status
//! - `horizon activity`: summary of the activity log
//! - `horizon health`: data directory, config and log checks
//! - `horizon config show|init|set|reset`: configuration management

pub mod format;

use std::io;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;

use crate::activity::reporter::{self, ActivityStats, DailyActivity};
use crate::activity::ActivityLog;
use crate::config::{self, HorizonConfig};
use crate::dashboard::{self, KpiValue, Section, SectionReport};
use crate::engine::{self, ComparisonResult, Dimension, GroupScores, Metric};
use crate::error::EngineError;
use crate::store::cache::DatasetStatus;
use crate::store::TableCache;

use format::{format_kpi, format_pct, format_value, metric_unit, truncate};

/// Output format for report commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Shared state for one CLI invocation.
pub struct Session {
    pub config: HorizonConfig,
    pub cache: TableCache,
    pub log: ActivityLog,
}

impl Session {
    pub fn new(config: HorizonConfig) -> Self {
        Self {
            cache: TableCache::new(config.data_dir()),
            log: ActivityLog::from_config(&config),
            config,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn csv_stdout() -> csv::Writer<io::Stdout> {
    csv::Writer::from_writer(io::stdout())
}

fn print_header(title: &str) {
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(60));
}

// ---------------------------------------------------------------------------
// horizon overview
// ---------------------------------------------------------------------------

pub fn run_overview(session: &mut Session, today: NaiveDate, format: OutputFormat) -> Result<()> {
    let overview = dashboard::overview(today);
    let datasets = session.cache.status();

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "overview": overview,
            "datasets": datasets,
        }));
    }

    print_header(overview.title);
    println!("  {}", overview.subtitle.dimmed());
    println!();
    println!(
        "{}",
        format!("Weekly Spotlight (Week {})", overview.spotlight.week)
            .bold()
            .yellow()
    );
    println!("  {}", overview.spotlight.finding);
    println!();

    println!("{}", "Sections".bold().cyan());
    for summary in &overview.sections {
        println!("  {:<14} {}", summary.slug.bold(), summary.title);
        println!("  {:<14} {}", "", truncate(summary.why_it_matters, 70).dimmed());
    }
    println!("  {:<14} {}", "compare".bold(), "Comparison Tool");
    println!();

    let available = datasets.iter().filter(|d| d.error.is_none()).count();
    let line = format!(
        "Datasets: {available}/{} available in {}",
        datasets.len(),
        session.cache.dir().display()
    );
    if available == datasets.len() {
        println!("{}", line.green());
    } else {
        println!("{}", line.yellow());
        println!("  {}", "Run `horizon datasets` for details.".dimmed());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// horizon kpis <section>
// ---------------------------------------------------------------------------

pub fn run_kpis(session: &mut Session, section: &str, format: OutputFormat) -> Result<()> {
    let section = Section::parse(section).with_context(|| {
        let known: Vec<&str> = Section::ALL.iter().map(|s| s.slug()).collect();
        format!("unknown section '{section}' (expected one of: {})", known.join(", "))
    })?;

    let Session { config, cache, log } = session;
    let report = log.track("kpis", section.slug(), "cli", || {
        Ok(dashboard::section_report(section, cache, config))
    })?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Csv => print_kpis_csv(&report)?,
        OutputFormat::Table => print_kpis_table(&report),
    }

    Ok(())
}

fn print_kpis_table(report: &SectionReport) {
    print_header(report.title);
    println!("  {}", report.why_it_matters.dimmed());
    println!();

    for (i, kpi) in report.kpis.iter().enumerate() {
        let value = format_kpi(&kpi.value);
        let label = kpi.value.label().unwrap_or("");
        let line = format!(
            "  {:<46} {:>18}  {}",
            truncate(kpi.title, 46),
            value,
            truncate(label, 30)
        );
        if matches!(kpi.value, KpiValue::Unavailable { data_gap: false, .. }) {
            println!("{}", line.red());
        } else if !kpi.value.is_available() {
            println!("{}", line.yellow());
        } else if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    if report.unavailable() > 0 {
        println!();
        println!(
            "  {}",
            format!(
                "{} KPI(s) unavailable. Use --format json for the reasons.",
                report.unavailable()
            )
            .dimmed()
        );
    }
}

fn print_kpis_csv(report: &SectionReport) -> Result<()> {
    let mut out = csv_stdout();
    out.write_record(["key", "title", "value", "label", "unavailable_reason"])?;
    for kpi in &report.kpis {
        let (value, reason) = match &kpi.value {
            KpiValue::Available { value, .. } => (value.to_string(), String::new()),
            KpiValue::Unavailable { reason, .. } => (String::new(), reason.clone()),
        };
        out.write_record([
            kpi.key,
            kpi.title,
            value.as_str(),
            kpi.value.label().unwrap_or(""),
            reason.as_str(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// horizon compare
// ---------------------------------------------------------------------------

pub fn run_compare(
    session: &mut Session,
    dimension: &str,
    metric: &str,
    from: Option<i32>,
    to: Option<i32>,
    format: OutputFormat,
) -> Result<()> {
    let dimension = Dimension::parse(dimension)
        .with_context(|| format!("unknown dimension '{dimension}'"))?;
    let metric = Metric::parse(metric).with_context(|| format!("unknown metric '{metric}'"))?;

    let Session { config, cache, log } = session;
    let default_start = config.comparison.default_start_year;
    let detail = format!("{dimension}/{metric}");

    let result = log.track("compare", &detail, "cli", || {
        let range = match to {
            Some(end) => (from.unwrap_or(default_start), end),
            None => engine::default_year_range(cache, dimension, metric, from, default_start)?,
        };
        engine::compare(cache, dimension, metric, range)
    });

    let result = match result {
        Ok(r) => r,
        Err(EngineError::UnsupportedCombination { .. }) => {
            let valid: Vec<String> = engine::metrics_for(dimension)
                .iter()
                .map(ToString::to_string)
                .collect();
            anyhow::bail!(
                "No data available for the selected combination ({dimension} by {metric}). \
                 Valid metrics for {dimension}: {}",
                valid.join(", ")
            );
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Csv => print!("{}", result.to_csv()?),
        OutputFormat::Table => print_compare_table(&result),
    }

    Ok(())
}

fn print_compare_table(result: &ComparisonResult) {
    let (start, end) = result.year_range;
    let title = if result.year_filtered {
        format!(
            "{} by {} ({start}-{end})",
            result.metric.label(),
            result.dimension.label()
        )
    } else {
        format!("{} by {}", result.metric.label(), result.dimension.label())
    };
    print_header(&title);

    if result.is_empty() {
        println!("{}", "No rows in the selected range.".yellow());
        return;
    }

    let unit = metric_unit(result.metric);
    println!("  {:>4}  {:<36} {:>20}", "Rank", result.dimension.label(), "Max");
    println!("  {}", "-".repeat(62));
    for (i, row) in result.rows.iter().enumerate() {
        let line = format!(
            "  {:>4}  {:<36} {:>20}",
            i + 1,
            truncate(&row.group, 36),
            format_value(row.value, unit)
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    println!();
    let insights = &result.insights;
    if let Some(leader) = &insights.leader {
        println!(
            "  {} {} ({})",
            "Leader:  ".bold(),
            leader.group,
            format_value(leader.value, unit)
        );
    }
    if let Some(trailing) = &insights.trailing {
        println!(
            "  {} {} ({})",
            "Trailing:".bold(),
            trailing.group,
            format_value(trailing.value, unit)
        );
    }
    if let Some(share) = insights.top3_share {
        println!("  {} {}", "Top 3:   ".bold(), format_pct(share));
    }
}

// ---------------------------------------------------------------------------
// horizon concentration / horizon volatility
// ---------------------------------------------------------------------------

pub fn run_concentration(session: &mut Session, format: OutputFormat) -> Result<()> {
    let Session { config, cache, log } = session;
    let config = &*config;
    let detail = config.concentration.regions.join(",");
    let scores = log.track("concentration", &detail, "cli", || {
        dashboard::investment_concentration(cache, config)
    })?;

    print_scores(
        &scores,
        format,
        "Investment Concentration (HHI)",
        &config.concentration.key_field,
        "hhi",
        |v| format!("{v:.3}"),
    )
}

pub fn run_volatility(session: &mut Session, format: OutputFormat) -> Result<()> {
    let Session { cache, log, .. } = session;
    let scores = log.track("volatility", "investment_by_sector", "cli", || {
        dashboard::sector_volatility(cache)
    })?;

    print_scores(
        &scores,
        format,
        "Investment Volatility by Focus Area",
        "focus_area",
        "volatility_pp",
        |v| format!("{v:.1} pp"),
    )
}

fn print_scores(
    scores: &GroupScores,
    format: OutputFormat,
    title: &str,
    key_header: &str,
    value_header: &str,
    fmt_value: impl Fn(f64) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(scores)?,
        OutputFormat::Csv => {
            let mut out = csv_stdout();
            out.write_record([key_header, value_header])?;
            for (key, v) in &scores.ranked {
                out.write_record([key.as_str(), v.to_string().as_str()])?;
            }
            out.flush()?;
        }
        OutputFormat::Table => {
            print_header(title);
            if scores.ranked.is_empty() {
                println!("{}", "Nothing to rank.".yellow());
            }
            for (i, (key, v)) in scores.ranked.iter().enumerate() {
                let line = format!(
                    "  {:>4}  {:<36} {:>14}",
                    i + 1,
                    truncate(key, 36),
                    fmt_value(*v)
                );
                if i % 2 == 0 {
                    println!("{line}");
                } else {
                    println!("{}", line.dimmed());
                }
            }
            if !scores.skipped.is_empty() {
                println!();
                println!(
                    "  {} {}",
                    "Skipped (not enough data):".dimmed(),
                    scores.skipped.join(", ").dimmed()
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// horizon datasets
// ---------------------------------------------------------------------------

pub fn run_datasets(session: &mut Session, format: OutputFormat) -> Result<()> {
    let statuses = session.cache.status();

    match format {
        OutputFormat::Json => print_json(&statuses)?,
        OutputFormat::Csv => print_datasets_csv(&statuses)?,
        OutputFormat::Table => {
            print_header("Datasets");
            println!("  {}", session.cache.dir().display().to_string().dimmed());
            println!();
            for status in &statuses {
                let stem = status.dataset.file_stem();
                match (&status.rows, &status.error) {
                    (Some(rows), _) if !status.unknown_labels.is_empty() => print_health_item(
                        stem,
                        true,
                        &format!(
                            "{rows} rows, unrecognised {}",
                            truncate(&status.unknown_labels.join(", "), 50)
                        ),
                    ),
                    (Some(rows), _) => print_health_item(stem, true, &format!("{rows} rows")),
                    (None, Some(err)) => print_health_item(stem, false, &truncate(err, 60)),
                    (None, None) => print_health_item(stem, false, "not loaded"),
                }
            }
        }
    }

    Ok(())
}

fn print_datasets_csv(statuses: &[DatasetStatus]) -> Result<()> {
    let mut out = csv_stdout();
    out.write_record(["dataset", "title", "path", "rows", "error", "unknown_labels"])?;
    for s in statuses {
        out.write_record([
            s.dataset.file_stem().to_string(),
            s.title.to_string(),
            s.path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            s.rows.map(|r| r.to_string()).unwrap_or_default(),
            s.error.clone().unwrap_or_default(),
            s.unknown_labels.join("; "),
        ])?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// horizon activity
// ---------------------------------------------------------------------------

pub fn run_activity(session: &Session, days: Option<u32>, format: OutputFormat) -> Result<()> {
    let entries = session.log.read_since_days(days);
    let stats = reporter::build_stats(&entries);
    let trend = reporter::daily_trend(&entries);

    if stats.total == 0 {
        println!(
            "{}",
            "No activity yet. Run some commands or open the dashboard.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "stats": stats,
            "trend": trend,
        }))?,
        OutputFormat::Csv => print_activity_csv(&stats)?,
        OutputFormat::Table => print_activity_table(&stats, &trend),
    }

    Ok(())
}

fn print_activity_table(stats: &ActivityStats, trend: &[DailyActivity]) {
    print_header("horizon Activity");
    println!("  {} {}", "Invocations:".bold(), stats.total);
    println!(
        "  {} {} ({})",
        "Errors:     ".bold(),
        stats.errors,
        format_pct(stats.error_rate_pct)
    );
    println!();

    println!("{}", "By Action".bold().cyan());
    println!(
        "  {:<16} {:>6} {:>7} {:>10}  Top error",
        "Action", "Count", "Errors", "Avg ms"
    );
    println!("  {}", "-".repeat(58));
    for (i, a) in stats.actions.iter().enumerate() {
        let line = format!(
            "  {:<16} {:>6} {:>7} {:>10.1}  {}",
            truncate(&a.action, 16),
            a.count,
            a.errors,
            a.avg_duration_ms,
            a.top_error.as_deref().unwrap_or("-"),
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    if !trend.is_empty() {
        println!();
        println!("{}", "Daily".bold().cyan());
        for day in trend {
            let bar = "█".repeat(day.invocations.min(40));
            println!(
                "  {:<12} {:>5}  {}",
                day.date,
                day.invocations,
                if day.errors > 0 { bar.yellow() } else { bar.green() }
            );
        }
    }
}

fn print_activity_csv(stats: &ActivityStats) -> Result<()> {
    let mut out = csv_stdout();
    out.write_record(["action", "count", "errors", "avg_duration_ms", "top_error"])?;
    for a in &stats.actions {
        out.write_record([
            a.action.clone(),
            a.count.to_string(),
            a.errors.to_string(),
            format!("{:.1}", a.avg_duration_ms),
            a.top_error.clone().unwrap_or_default(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// horizon health
// ---------------------------------------------------------------------------

pub fn run_health(session: &mut Session) -> Result<()> {
    print_header("horizon Health Check");

    // 1. Data directory
    let dir = session.cache.dir().to_path_buf();
    let dir_ok = dir.is_dir();
    print_health_item(
        "Data directory",
        dir_ok,
        &if dir_ok {
            dir.display().to_string()
        } else {
            format!("{} (missing)", dir.display())
        },
    );

    // 2. Datasets
    let statuses = session.cache.status();
    let loaded = statuses.iter().filter(|s| s.error.is_none()).count();
    print_health_item(
        "Datasets",
        loaded == statuses.len(),
        &format!("{loaded}/{} loadable", statuses.len()),
    );

    // 3. Config file
    let config_path = config::global_config_file();
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    print_health_item(
        "Config file",
        config_exists,
        &if config_exists {
            "~/.horizon/config.toml".to_string()
        } else {
            "using defaults (run `horizon config init`)".to_string()
        },
    );

    // 4. Concentration regions
    let regions = &session.config.concentration.regions;
    print_health_item(
        "Concentration regions",
        !regions.is_empty(),
        &if regions.is_empty() {
            "none configured".to_string()
        } else {
            regions.join(", ")
        },
    );

    // 5. Activity log
    match session.log.path() {
        Some(path) => {
            let exists = path.exists();
            let detail = if exists {
                format!("{} entries", session.log.read_all().len())
            } else {
                "no log file yet".to_string()
            };
            print_health_item("Activity log", exists, &detail);
        }
        None => print_health_item("Activity log", true, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// horizon config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    print_header("Effective horizon Configuration");
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.horizon/config.toml", global_exists);
    print_source(".horizon.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "HORIZON_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.horizon/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!("  {}", "Edit the file to point horizon at your data.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

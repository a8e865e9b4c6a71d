//! Number formatting for terminal output. Engine values stay unrounded; only
//! this module decides how they read.

use crate::dashboard::{KpiValue, Unit};
use crate::engine::Metric;

/// Format a number with comma separators, rounded to a whole number.
pub fn format_number(n: f64) -> String {
    let rounded = n.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut result = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    if rounded < 0.0 {
        result.push('-');
    }
    result.chars().rev().collect()
}

/// Short human form: `45.2M`, `1.3B`, `980`. Very large magnitudes switch
/// to scientific notation.
pub fn format_compact(n: f64) -> String {
    const SCALES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

    if n.abs() >= 1e15 {
        return format!("{n:.2e}");
    }
    for (scale, suffix) in SCALES {
        if n.abs() >= scale {
            return format!("{:.1}{suffix}", n / scale);
        }
    }
    trim_decimals(n)
}

pub fn format_usd(n: f64) -> String {
    if n < 0.0 {
        format!("-${}", format_compact(-n))
    } else {
        format!("${}", format_compact(n))
    }
}

pub fn format_pct(n: f64) -> String {
    format!("{n:.1}%")
}

/// Up to two decimals, trailing zeros dropped.
fn trim_decimals(n: f64) -> String {
    let s = format!("{n:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

pub fn format_value(value: f64, unit: Unit) -> String {
    match unit {
        Unit::Usd => format_usd(value),
        Unit::Count => format_number(value),
        Unit::Percent => format_pct(value),
        Unit::PercentPoints => format!("{value:+.1} pp"),
        Unit::Petaflop => format!("{} petaFLOP", format_compact(value)),
        Unit::Datapoints => format!("{} datapoints", format_compact(value)),
        Unit::Parameters => format!("{} params", format_compact(value)),
        Unit::Index => format!("{value:.3}"),
    }
}

/// `N/A` when the data is missing, `error` when it could not be read.
pub fn format_kpi(value: &KpiValue) -> String {
    match value {
        KpiValue::Available { value, unit, .. } => format_value(*value, *unit),
        KpiValue::Unavailable { data_gap: true, .. } => "N/A".to_string(),
        KpiValue::Unavailable { .. } => "error".to_string(),
    }
}

/// Display unit of a comparison metric.
pub fn metric_unit(metric: Metric) -> Unit {
    match metric {
        Metric::SystemCount | Metric::Patents => Unit::Count,
        Metric::TrainingCost => Unit::Usd,
        Metric::Parameters => Unit::Parameters,
        Metric::Computation => Unit::Petaflop,
    }
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

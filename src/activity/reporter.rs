//! Activity reporter: aggregates the activity log for `horizon activity`.
//!
//! - **Summary**: totals, error rate, per-action breakdown
//! - **Trends**: per-day invocation counts

use std::collections::HashMap;

use serde::Serialize;

use super::logger::ActivityEntry;

/// Summary statistics over a set of activity entries.
#[derive(Debug, Default, Serialize)]
pub struct ActivityStats {
    pub total: usize,
    pub errors: usize,
    pub error_rate_pct: f64,
    pub actions: Vec<ActionStat>,
}

/// Per-action aggregated statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ActionStat {
    pub action: String,
    pub count: usize,
    pub errors: usize,
    pub avg_duration_ms: f64,
    /// Most frequent error kind for this action, if any failed.
    pub top_error: Option<String>,
}

/// A single day in the activity trend.
#[derive(Debug, Clone, Serialize)]
pub struct DailyActivity {
    pub date: String,
    pub invocations: usize,
    pub errors: usize,
}

pub fn build_stats(entries: &[ActivityEntry]) -> ActivityStats {
    if entries.is_empty() {
        return ActivityStats::default();
    }

    let total = entries.len();
    let errors = entries.iter().filter(|e| !e.is_ok()).count();

    ActivityStats {
        total,
        errors,
        error_rate_pct: errors as f64 / total as f64 * 100.0,
        actions: action_stats(entries),
    }
}

/// Group by action, most used first.
fn action_stats(entries: &[ActivityEntry]) -> Vec<ActionStat> {
    let mut groups: HashMap<&str, Vec<&ActivityEntry>> = HashMap::new();
    for entry in entries {
        groups.entry(entry.action.as_str()).or_default().push(entry);
    }

    let mut stats: Vec<ActionStat> = groups
        .into_iter()
        .map(|(action, group)| {
            let count = group.len();
            let total_ms: u64 = group.iter().map(|e| e.duration_ms).sum();

            let mut error_counts: HashMap<&str, usize> = HashMap::new();
            for e in group.iter().filter(|e| !e.is_ok()) {
                *error_counts.entry(e.outcome.as_str()).or_default() += 1;
            }
            let errors = error_counts.values().sum();
            let top_error = error_counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(kind, _)| kind.to_string());

            ActionStat {
                action: action.to_string(),
                count,
                errors,
                avg_duration_ms: total_ms as f64 / count as f64,
                top_error,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.action.cmp(&b.action)));
    stats
}

/// Per-day counts, ascending by date.
pub fn daily_trend(entries: &[ActivityEntry]) -> Vec<DailyActivity> {
    let mut daily: HashMap<String, (usize, usize)> = HashMap::new();
    for entry in entries {
        // RFC 3339 timestamps start with YYYY-MM-DD.
        let date = entry.timestamp.get(..10).unwrap_or("unknown").to_string();
        let slot = daily.entry(date).or_default();
        slot.0 += 1;
        if !entry.is_ok() {
            slot.1 += 1;
        }
    }

    let mut trend: Vec<DailyActivity> = daily
        .into_iter()
        .map(|(date, (invocations, errors))| DailyActivity {
            date,
            invocations,
            errors,
        })
        .collect();
    trend.sort_by(|a, b| a.date.cmp(&b.date));
    trend
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: &str, action: &str, outcome: &str, ms: u64) -> ActivityEntry {
        ActivityEntry {
            timestamp: ts.to_string(),
            action: action.to_string(),
            detail: String::new(),
            source: "cli".to_string(),
            outcome: outcome.to_string(),
            duration_ms: ms,
        }
    }

    fn sample_entries() -> Vec<ActivityEntry> {
        vec![
            entry("2025-01-15T10:00:00+00:00", "compare", "ok", 4),
            entry("2025-01-15T10:05:00+00:00", "compare", "unsupported_combination", 0),
            entry("2025-01-15T10:10:00+00:00", "kpis", "ok", 12),
            entry("2025-01-16T09:00:00+00:00", "compare", "ok", 2),
        ]
    }

    #[test]
    fn totals_and_error_rate() {
        let stats = build_stats(&sample_entries());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.errors, 1);
        assert!((stats.error_rate_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn actions_grouped_most_used_first() {
        let stats = build_stats(&sample_entries());
        let compare = &stats.actions[0];
        assert_eq!(compare.action, "compare");
        assert_eq!(compare.count, 3);
        assert_eq!(compare.errors, 1);
        assert_eq!(compare.top_error.as_deref(), Some("unsupported_combination"));
        assert!((compare.avg_duration_ms - 2.0).abs() < 1e-9);
        assert_eq!(stats.actions[1].top_error, None);
    }

    #[test]
    fn empty_entries() {
        let stats = build_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.error_rate_pct, 0.0);
    }

    #[test]
    fn trend_by_day() {
        let trend = daily_trend(&sample_entries());
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, "2025-01-15");
        assert_eq!(trend[0].invocations, 3);
        assert_eq!(trend[0].errors, 1);
        assert_eq!(trend[1].date, "2025-01-16");
    }
}

//! Derived-metrics engine.
//!
//! Pure functions over [`crate::store::Table`]: KPI building blocks
//! (`metrics`), concentration and volatility scores (`concentration`) and the
//! grouped comparison tool (`compare`). No formatting happens here.

pub mod compare;
pub mod concentration;
pub mod metrics;

pub use compare::{
    ComparisonResult, ComparisonSource, Dimension, GroupValue, Insights, Metric, compare,
    compare_table, default_year_range, metrics_for, source_for, supported_pairs,
};
pub use concentration::{GroupScores, concentration_by_row, hhi, volatility, volatility_by_group};
pub use metrics::{
    Aggregate, group_mean_ranked, latest_year_group_mean, latest_year_value, max_value,
    percent_change, percent_ratio, row_with_max, year_over_year_delta, yearly_series,
};

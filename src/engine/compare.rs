//! Comparison aggregator: group one dataset by a chosen dimension and rank
//! the best value per group.
//!
//! The caller collects a (dimension, metric, year range) selection and calls
//! [`compare`] explicitly; nothing here reacts to partial selections. Only
//! the pairs listed in [`SUPPORTED_SOURCES`] are valid.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::metrics::numeric;
use crate::error::{EngineError, EngineResult};
use crate::store::{DatasetId, Table, TableCache};

// ---------------------------------------------------------------------------
// Selections
// ---------------------------------------------------------------------------

/// What to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
    Country,
    Domain,
    OrgType,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Self::Country, Self::Domain, Self::OrgType];

    pub fn parse(s: &str) -> Option<Self> {
        match letters(s).as_str() {
            "country" => Some(Self::Country),
            "domain" => Some(Self::Domain),
            "orgtype" | "organizationtype" | "organisationtype" | "org" => Some(Self::OrgType),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Country => "Country",
            Self::Domain => "Domain",
            Self::OrgType => "Organization Type",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Country => write!(f, "country"),
            Self::Domain => write!(f, "domain"),
            Self::OrgType => write!(f, "org-type"),
        }
    }
}

/// What to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    SystemCount,
    TrainingCost,
    Parameters,
    Computation,
    Patents,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Self::SystemCount,
        Self::TrainingCost,
        Self::Parameters,
        Self::Computation,
        Self::Patents,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match letters(s).as_str() {
            "systemcount" | "systems" => Some(Self::SystemCount),
            "trainingcost" | "cost" => Some(Self::TrainingCost),
            "parameters" | "params" => Some(Self::Parameters),
            "computation" | "compute" => Some(Self::Computation),
            "patents" => Some(Self::Patents),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SystemCount => "System Count",
            Self::TrainingCost => "Training Cost",
            Self::Parameters => "Parameters",
            Self::Computation => "Computation",
            Self::Patents => "Patents",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemCount => write!(f, "system-count"),
            Self::TrainingCost => write!(f, "training-cost"),
            Self::Parameters => write!(f, "parameters"),
            Self::Computation => write!(f, "computation"),
            Self::Patents => write!(f, "patents"),
        }
    }
}

fn letters(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Supported combinations
// ---------------------------------------------------------------------------

/// Where a (dimension, metric) pair reads its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComparisonSource {
    pub dimension: Dimension,
    pub metric: Metric,
    pub dataset: DatasetId,
    pub key_field: &'static str,
    pub value_field: &'static str,
    /// `None` means "use a year-like column if the table has one".
    pub year_field: Option<&'static str>,
}

const fn source(
    dimension: Dimension,
    metric: Metric,
    dataset: DatasetId,
    key_field: &'static str,
    value_field: &'static str,
    year_field: Option<&'static str>,
) -> ComparisonSource {
    ComparisonSource {
        dimension,
        metric,
        dataset,
        key_field,
        value_field,
        year_field,
    }
}

/// Every valid (dimension, metric) pair. Anything else is rejected with
/// `UnsupportedCombination`.
pub const SUPPORTED_SOURCES: [ComparisonSource; 8] = [
    source(
        Dimension::Country,
        Metric::SystemCount,
        DatasetId::CumulativeSystems,
        "entity",
        "cumulative_count",
        Some("year"),
    ),
    source(
        Dimension::Country,
        Metric::Patents,
        DatasetId::PatentsByCountry,
        "entity",
        "num_patent_applications",
        None,
    ),
    source(
        Dimension::Domain,
        Metric::TrainingCost,
        DatasetId::TrainingCost,
        "domain",
        "cost__inflation_adjusted",
        Some("day"),
    ),
    source(
        Dimension::Domain,
        Metric::Parameters,
        DatasetId::Parameters,
        "domain",
        "parameters",
        Some("day"),
    ),
    source(
        Dimension::Domain,
        Metric::Computation,
        DatasetId::Computation,
        "domain",
        "training_computation_petaflop",
        Some("day"),
    ),
    source(
        Dimension::OrgType,
        Metric::TrainingCost,
        DatasetId::TrainingCost,
        "organization_categorization",
        "cost__inflation_adjusted",
        Some("day"),
    ),
    source(
        Dimension::OrgType,
        Metric::Parameters,
        DatasetId::Parameters,
        "organization_categorization",
        "parameters",
        Some("day"),
    ),
    source(
        Dimension::OrgType,
        Metric::Computation,
        DatasetId::Computation,
        "organization_categorization",
        "training_computation_petaflop",
        Some("day"),
    ),
];

/// Look up the source for a pair.
pub fn source_for(dimension: Dimension, metric: Metric) -> EngineResult<&'static ComparisonSource> {
    SUPPORTED_SOURCES
        .iter()
        .find(|s| s.dimension == dimension && s.metric == metric)
        .ok_or_else(|| EngineError::UnsupportedCombination {
            dimension: dimension.to_string(),
            metric: metric.to_string(),
        })
}

/// Every valid (dimension, metric) pair, in selector order.
pub fn supported_pairs() -> Vec<(Dimension, Metric)> {
    SUPPORTED_SOURCES
        .iter()
        .map(|s| (s.dimension, s.metric))
        .collect()
}

/// Metrics valid for a dimension, in selector order.
pub fn metrics_for(dimension: Dimension) -> Vec<Metric> {
    SUPPORTED_SOURCES
        .iter()
        .filter(|s| s.dimension == dimension)
        .map(|s| s.metric)
        .collect()
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub group: String,
    pub value: f64,
}

/// Headline facts derived from a ranked comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    pub leader: Option<GroupValue>,
    pub trailing: Option<GroupValue>,
    /// Share of the total held by the top three groups, in percent. Present
    /// only with at least three groups and a non-zero total.
    pub top3_share: Option<f64>,
}

impl Insights {
    fn from_ranked(rows: &[GroupValue]) -> Self {
        let top3_share = if rows.len() >= 3 {
            let total: f64 = rows.iter().map(|r| r.value).sum();
            let top: f64 = rows.iter().take(3).map(|r| r.value).sum();
            (total != 0.0).then(|| top / total * 100.0)
        } else {
            None
        };

        Self {
            leader: rows.first().cloned(),
            trailing: rows.last().cloned(),
            top3_share,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub dimension: Dimension,
    pub metric: Metric,
    pub year_range: (i32, i32),
    /// Whether the year range was applied. Year-less snapshots skip it.
    pub year_filtered: bool,
    pub rows: Vec<GroupValue>,
    pub insights: Insights,
}

impl ComparisonResult {
    /// No group survived the filter. A normal outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ranked rows as CSV with a `<dimension>,<metric>` header, values
    /// unrounded.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([self.dimension.to_string(), self.metric.to_string()])?;
        for row in &self.rows {
            writer.write_record([row.group.clone(), row.value.to_string()])?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run the comparison for `source` against an already loaded table.
pub fn compare_table(
    table: &Table,
    source: &ComparisonSource,
    year_range: (i32, i32),
) -> EngineResult<ComparisonResult> {
    let ki = table.column_index(source.key_field)?;
    let vi = table.column_index(source.value_field)?;

    let year_field = source.year_field.or_else(|| table.year_like_field());
    let yi = year_field.map(|f| table.column_index(f)).transpose()?;
    let (start, end) = year_range;

    let mut rows: Vec<GroupValue> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in table.rows() {
        if let Some(yi) = yi {
            match row.cell(yi).year() {
                Some(y) if start <= y && y <= end => {}
                _ => continue,
            }
        }
        let Some(group) = row.cell(ki).key() else {
            continue;
        };
        let Some(v) = numeric(row.cell(vi), source.value_field)? else {
            continue;
        };

        match index.get(&group) {
            Some(&i) => {
                if v > rows[i].value {
                    rows[i].value = v;
                }
            }
            None => {
                index.insert(group.clone(), rows.len());
                rows.push(GroupValue { group, value: v });
            }
        }
    }

    // Stable: equal values keep first-seen order.
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    let insights = Insights::from_ranked(&rows);

    Ok(ComparisonResult {
        dimension: source.dimension,
        metric: source.metric,
        year_range,
        year_filtered: yi.is_some(),
        rows,
        insights,
    })
}

/// Group `metric` by `dimension` over `year_range` (inclusive), keeping the
/// maximum per group, highest first.
pub fn compare(
    cache: &mut TableCache,
    dimension: Dimension,
    metric: Metric,
    year_range: (i32, i32),
) -> EngineResult<ComparisonResult> {
    let source = source_for(dimension, metric)?;
    let table = cache.dataset(source.dataset)?;
    compare_table(&table, source, year_range)
}

/// Year range for a selection without an explicit upper bound: `from` (or
/// `default_start`) up to the latest year in the data.
///
/// Only a defaulted lower bound is pulled down to the latest year; an
/// explicit `from` past the data stays an empty range. Year-less sources and
/// tables without readable years get `(start, start)`, which filters to
/// nothing or is ignored.
pub fn default_year_range(
    cache: &mut TableCache,
    dimension: Dimension,
    metric: Metric,
    from: Option<i32>,
    default_start: i32,
) -> EngineResult<(i32, i32)> {
    let source = source_for(dimension, metric)?;
    let table = cache.dataset(source.dataset)?;
    let start = from.unwrap_or(default_start);

    let Some(field) = source.year_field.or_else(|| table.year_like_field()) else {
        return Ok((start, start));
    };
    let Some(latest) = table.years(field)?.last().copied() else {
        return Ok((start, start));
    };

    match from {
        Some(_) => Ok((start, latest)),
        None => Ok((start.min(latest), latest)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Derived metrics: maxima, leaders, year-over-year deltas and group means.
//!
//! Every function here is pure: it reads a [`Table`] and returns plain data
//! or a typed [`EngineError`]. A zero or missing denominator is always an
//! error; nothing is silently coerced to 0% or infinity.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::store::{Cell, Row, Table};

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// How several values for the same year collapse into one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    #[default]
    Max,
    Min,
    Sum,
    Mean,
}

impl Aggregate {
    /// Apply the aggregate. `None` for an empty slice.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let v = match self {
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Sum => values.iter().sum(),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
        };
        Some(v)
    }
}

// ---------------------------------------------------------------------------
// Cell access
// ---------------------------------------------------------------------------

/// Numeric value of a cell. `Null` is absent, anything non-numeric is a
/// schema mismatch on `field`.
pub(crate) fn numeric(cell: &Cell, field: &str) -> EngineResult<Option<f64>> {
    match cell {
        Cell::Number(n) => Ok(Some(*n)),
        Cell::Null => Ok(None),
        other => Err(EngineError::schema(
            field,
            format!("expected a number, found '{other}'"),
        )),
    }
}

/// `(row index, value)` of the first row holding the maximum.
fn max_entry(table: &Table, value_field: &str) -> EngineResult<(usize, f64)> {
    let idx = table.column_index(value_field)?;
    let mut best: Option<(usize, f64)> = None;

    for (i, row) in table.rows().iter().enumerate() {
        let Some(v) = numeric(row.cell(idx), value_field)? else {
            continue;
        };
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }

    best.ok_or_else(|| EngineError::empty(value_field))
}

// ---------------------------------------------------------------------------
// Maxima
// ---------------------------------------------------------------------------

/// Largest value of `value_field` across the table.
pub fn max_value(table: &Table, value_field: &str) -> EngineResult<f64> {
    max_entry(table, value_field).map(|(_, v)| v)
}

/// First row, in original order, attaining the maximum of `value_field`.
pub fn row_with_max<'a>(table: &'a Table, value_field: &str) -> EngineResult<&'a Row> {
    let (i, _) = max_entry(table, value_field)?;
    Ok(&table.rows()[i])
}

// ---------------------------------------------------------------------------
// Year-based metrics
// ---------------------------------------------------------------------------

/// Values of `value_field` bucketed by the year read from `year_field`.
/// Rows missing either field are skipped.
fn values_by_year(
    table: &Table,
    year_field: &str,
    value_field: &str,
) -> EngineResult<BTreeMap<i32, Vec<f64>>> {
    let yi = table.column_index(year_field)?;
    let vi = table.column_index(value_field)?;
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();

    for row in table.rows() {
        let Some(year) = row.cell(yi).year() else {
            continue;
        };
        if let Some(v) = numeric(row.cell(vi), value_field)? {
            by_year.entry(year).or_default().push(v);
        }
    }

    Ok(by_year)
}

/// One aggregated value per year, ascending by year.
pub fn yearly_series(
    table: &Table,
    year_field: &str,
    value_field: &str,
    agg: Aggregate,
) -> EngineResult<Vec<(i32, f64)>> {
    let by_year = values_by_year(table, year_field, value_field)?;
    Ok(by_year
        .into_iter()
        .filter_map(|(year, values)| agg.apply(&values).map(|v| (year, v)))
        .collect())
}

/// Latest year present and the aggregated value for it.
pub fn latest_year_value(
    table: &Table,
    year_field: &str,
    value_field: &str,
    agg: Aggregate,
) -> EngineResult<(i32, f64)> {
    yearly_series(table, year_field, value_field, agg)?
        .pop()
        .ok_or_else(|| EngineError::empty(value_field))
}

/// Percentage change from `previous` to `latest`.
pub fn percent_change(latest: f64, previous: f64) -> EngineResult<f64> {
    if previous == 0.0 {
        return Err(EngineError::division_by_zero(
            "previous value is zero, percentage change is undefined",
        ));
    }
    Ok((latest - previous) / previous * 100.0)
}

/// `numerator / denominator * 100`.
pub fn percent_ratio(numerator: f64, denominator: f64) -> EngineResult<f64> {
    if denominator == 0.0 {
        return Err(EngineError::division_by_zero("ratio denominator is zero"));
    }
    Ok(numerator / denominator * 100.0)
}

/// Year-over-year percentage change between the latest year `Y` in the table
/// and `Y - 1`, each side collapsed with `agg`.
pub fn year_over_year_delta(
    table: &Table,
    year_field: &str,
    value_field: &str,
    agg: Aggregate,
) -> EngineResult<f64> {
    let by_year = values_by_year(table, year_field, value_field)?;
    let (&latest_year, latest_values) = by_year
        .last_key_value()
        .ok_or_else(|| EngineError::empty(value_field))?;

    let previous_year = latest_year - 1;
    let previous_values = by_year.get(&previous_year).ok_or(EngineError::MissingYear {
        year: previous_year,
    })?;

    let latest = agg
        .apply(latest_values)
        .ok_or_else(|| EngineError::empty(value_field))?;
    let previous = agg
        .apply(previous_values)
        .ok_or(EngineError::MissingYear {
            year: previous_year,
        })?;

    percent_change(latest, previous)
}

// ---------------------------------------------------------------------------
// Group means
// ---------------------------------------------------------------------------

/// Per-group arithmetic means in first-seen group order.
fn group_means<'a>(
    rows: impl Iterator<Item = &'a Row>,
    gi: usize,
    vi: usize,
    value_field: &str,
) -> EngineResult<Vec<(String, f64)>> {
    let mut order: Vec<(String, f64, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(group) = row.cell(gi).key() else {
            continue;
        };
        let Some(v) = numeric(row.cell(vi), value_field)? else {
            continue;
        };
        let slot = *index.entry(group.clone()).or_insert_with(|| {
            order.push((group, 0.0, 0));
            order.len() - 1
        });
        order[slot].1 += v;
        order[slot].2 += 1;
    }

    Ok(order
        .into_iter()
        .map(|(g, sum, n)| (g, sum / n as f64))
        .collect())
}

/// Mean of `value_field` per distinct `group_field`, highest first. Ties keep
/// the order in which the groups first appear.
pub fn group_mean_ranked(
    table: &Table,
    group_field: &str,
    value_field: &str,
) -> EngineResult<Vec<(String, f64)>> {
    let gi = table.column_index(group_field)?;
    let vi = table.column_index(value_field)?;

    let mut means = group_means(table.rows().iter(), gi, vi, value_field)?;
    if means.is_empty() {
        return Err(EngineError::empty(value_field));
    }
    // Stable sort keeps first-seen order among equal means.
    means.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(means)
}

/// Mean of `value_field` per group, restricted to the year
/// `max(year) - offset`. `offset = 0` is the latest year, `1` the one before.
pub fn latest_year_group_mean(
    table: &Table,
    group_field: &str,
    value_field: &str,
    year_field: &str,
    offset: u32,
) -> EngineResult<BTreeMap<String, f64>> {
    let gi = table.column_index(group_field)?;
    let vi = table.column_index(value_field)?;
    let yi = table.column_index(year_field)?;

    let latest = table
        .rows()
        .iter()
        .filter_map(|r| r.cell(yi).year())
        .max()
        .ok_or_else(|| EngineError::empty(year_field))?;
    let target = latest - offset as i32;

    let rows: Vec<&Row> = table
        .rows()
        .iter()
        .filter(|r| r.cell(yi).year() == Some(target))
        .collect();
    if rows.is_empty() {
        return Err(EngineError::MissingYear { year: target });
    }

    let means = group_means(rows.into_iter(), gi, vi, value_field)?;
    if means.is_empty() {
        return Err(EngineError::empty(value_field));
    }
    Ok(means.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn yearly(rows: &[(i32, f64)]) -> Table {
        Table::from_records(
            "yearly",
            &["year", "value"],
            rows.iter()
                .map(|&(y, v)| vec![Cell::from(y), Cell::from(v)])
                .collect(),
        )
    }

    fn grouped(rows: &[(&str, i32, f64)]) -> Table {
        Table::from_records(
            "grouped",
            &["entity", "year", "value"],
            rows.iter()
                .map(|&(g, y, v)| vec![Cell::from(g), Cell::from(y), Cell::from(v)])
                .collect(),
        )
    }

    #[test]
    fn aggregate_apply() {
        let values = [3.0, 1.0, 2.0];
        assert_eq!(Aggregate::Max.apply(&values), Some(3.0));
        assert_eq!(Aggregate::Min.apply(&values), Some(1.0));
        assert_eq!(Aggregate::Sum.apply(&values), Some(6.0));
        assert_eq!(Aggregate::Mean.apply(&values), Some(2.0));
        assert_eq!(Aggregate::Max.apply(&[]), None);
    }

    #[test]
    fn max_value_skips_nulls() {
        let table = Table::from_records(
            "t",
            &["value"],
            vec![vec![Cell::Null], vec![Cell::from(7.0)], vec![Cell::from(3.0)]],
        );
        assert_eq!(max_value(&table, "value").unwrap(), 7.0);
    }

    #[test]
    fn max_value_all_null_is_empty_input() {
        let table = Table::from_records("t", &["value"], vec![vec![Cell::Null]]);
        assert!(matches!(
            max_value(&table, "value"),
            Err(EngineError::EmptyInput { .. })
        ));
    }

    #[test]
    fn max_value_rejects_text() {
        let table = Table::from_records("t", &["value"], vec![vec![Cell::from("lots")]]);
        assert!(matches!(
            max_value(&table, "value"),
            Err(EngineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn row_with_max_first_occurrence_wins() {
        let table = grouped(&[("a", 2020, 5.0), ("b", 2021, 9.0), ("c", 2022, 9.0)]);
        let row = row_with_max(&table, "value").unwrap();
        assert_eq!(table.value(row, "entity").unwrap(), &Cell::from("b"));
    }

    #[test]
    fn yoy_uses_latest_and_previous_year() {
        let table = yearly(&[(2021, 50.0), (2022, 100.0), (2023, 150.0)]);
        let delta = year_over_year_delta(&table, "year", "value", Aggregate::Max).unwrap();
        assert!((delta - 50.0).abs() < 1e-9);
    }

    #[test]
    fn yoy_aggregates_within_a_year() {
        let table = yearly(&[(2022, 10.0), (2022, 30.0), (2023, 20.0), (2023, 60.0)]);
        let max = year_over_year_delta(&table, "year", "value", Aggregate::Max).unwrap();
        assert!((max - 100.0).abs() < 1e-9);
        let sum = year_over_year_delta(&table, "year", "value", Aggregate::Sum).unwrap();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn yoy_missing_previous_year() {
        let table = yearly(&[(2020, 1.0), (2023, 2.0)]);
        let err = year_over_year_delta(&table, "year", "value", Aggregate::Max).unwrap_err();
        assert!(matches!(err, EngineError::MissingYear { year: 2022 }));
    }

    #[test]
    fn yoy_zero_previous_is_division_by_zero() {
        let table = yearly(&[(2022, 0.0), (2023, 2.0)]);
        let err = year_over_year_delta(&table, "year", "value", Aggregate::Max).unwrap_err();
        assert!(matches!(err, EngineError::DivisionByZero { .. }));
    }

    #[test]
    fn yoy_negative_direction() {
        let table = yearly(&[(2022, 150.0), (2023, 100.0)]);
        let delta = year_over_year_delta(&table, "year", "value", Aggregate::Max).unwrap();
        assert!((delta - (-100.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn group_mean_ranked_orders_descending_with_stable_ties() {
        let table = grouped(&[
            ("x", 2020, 4.0),
            ("y", 2020, 10.0),
            ("x", 2021, 6.0),
            ("z", 2021, 5.0),
        ]);
        let ranked = group_mean_ranked(&table, "entity", "value").unwrap();
        assert_eq!(
            ranked,
            vec![
                ("y".to_string(), 10.0),
                ("x".to_string(), 5.0),
                ("z".to_string(), 5.0),
            ]
        );
    }

    #[test]
    fn latest_year_group_mean_offsets() {
        let table = grouped(&[
            ("us", 2022, 10.0),
            ("us", 2023, 20.0),
            ("cn", 2023, 16.0),
            ("cn", 2023, 18.0),
        ]);
        let latest = latest_year_group_mean(&table, "entity", "value", "year", 0).unwrap();
        assert_eq!(latest["us"], 20.0);
        assert_eq!(latest["cn"], 17.0);

        let previous = latest_year_group_mean(&table, "entity", "value", "year", 1).unwrap();
        assert_eq!(previous.len(), 1);
        assert_eq!(previous["us"], 10.0);

        let err = latest_year_group_mean(&table, "entity", "value", "year", 2).unwrap_err();
        assert!(matches!(err, EngineError::MissingYear { year: 2021 }));
    }

    #[test]
    fn percent_ratio_guards_zero() {
        assert_eq!(percent_ratio(1.0, 4.0).unwrap(), 25.0);
        assert!(percent_ratio(1.0, 0.0).is_err());
    }

    #[test]
    fn yearly_series_is_ascending() {
        let table = yearly(&[(2023, 3.0), (2021, 1.0), (2022, 2.0)]);
        let series = yearly_series(&table, "year", "value", Aggregate::Max).unwrap();
        assert_eq!(series, vec![(2021, 1.0), (2022, 2.0), (2023, 3.0)]);
        assert_eq!(
            latest_year_value(&table, "year", "value", Aggregate::Max).unwrap(),
            (2023, 3.0)
        );
    }
}

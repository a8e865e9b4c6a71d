//! Concentration and volatility scores.
//!
//! - **hhi**: Herfindahl-Hirschman style concentration over caller-chosen
//!   regions
//! - **volatility**: spread between the largest and smallest year-over-year
//!   growth in a series
//!
//! Both are also applied per group across a table, ranked highest first.

use std::collections::HashMap;

use serde::Serialize;

use super::metrics::numeric;
use crate::error::{EngineError, EngineResult};
use crate::store::Table;

/// Ranked per-group scores plus the groups that could not be scored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupScores {
    pub ranked: Vec<(String, f64)>,
    pub skipped: Vec<String>,
}

// ---------------------------------------------------------------------------
// Concentration
// ---------------------------------------------------------------------------

/// Sum of squared normalised shares. Shares need not add up to one.
///
/// A zero total (no activity at all) has a concentration of `0.0`.
pub fn hhi(shares: &[f64]) -> f64 {
    let total: f64 = shares.iter().sum();
    if total == 0.0 {
        return 0.0;
    }
    shares.iter().map(|s| (s / total).powi(2)).sum()
}

/// HHI per row of a wide table, using the `regions` columns as shares and
/// `key_field` (usually `year`) as the label. Rows with a missing share are
/// skipped. Highest concentration first.
pub fn concentration_by_row(
    table: &Table,
    key_field: &str,
    regions: &[String],
) -> EngineResult<GroupScores> {
    if regions.is_empty() {
        return Err(EngineError::insufficient("no regions configured"));
    }
    let ki = table.column_index(key_field)?;
    let region_idx: Vec<(usize, &str)> = regions
        .iter()
        .map(|r| table.column_index(r).map(|i| (i, r.as_str())))
        .collect::<EngineResult<_>>()?;

    let mut scores = GroupScores::default();
    for row in table.rows() {
        let Some(key) = row.cell(ki).key() else {
            continue;
        };

        let mut shares = Vec::with_capacity(region_idx.len());
        for &(i, field) in &region_idx {
            if let Some(v) = numeric(row.cell(i), field)? {
                shares.push(v);
            }
        }

        if shares.len() == region_idx.len() {
            scores.ranked.push((key, hhi(&shares)));
        } else {
            scores.skipped.push(key);
        }
    }

    scores.ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(scores)
}

// ---------------------------------------------------------------------------
// Volatility
// ---------------------------------------------------------------------------

/// Range of year-over-year growth rates in `series`.
///
/// The series is sorted by year; each consecutive pair contributes
/// `(v[i] - v[i-1]) / v[i-1] * 100`. Transitions from a zero value are
/// skipped rather than producing an infinite rate.
pub fn volatility(series: &[(i32, f64)]) -> EngineResult<f64> {
    if series.len() < 2 {
        return Err(EngineError::insufficient(format!(
            "volatility needs at least 2 points, got {}",
            series.len()
        )));
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|&(year, _)| year);

    let changes: Vec<f64> = sorted
        .windows(2)
        .filter(|w| w[0].1 != 0.0)
        .map(|w| (w[1].1 - w[0].1) / w[0].1 * 100.0)
        .collect();

    let (Some(max), Some(min)) = (
        changes.iter().copied().reduce(f64::max),
        changes.iter().copied().reduce(f64::min),
    ) else {
        return Err(EngineError::insufficient(
            "every transition starts from zero",
        ));
    };

    Ok((max - min).abs())
}

/// Volatility of `value_field` per distinct `group_field`, highest first.
/// Groups with fewer than two usable points land in `skipped`.
pub fn volatility_by_group(
    table: &Table,
    group_field: &str,
    year_field: &str,
    value_field: &str,
) -> EngineResult<GroupScores> {
    let gi = table.column_index(group_field)?;
    let yi = table.column_index(year_field)?;
    let vi = table.column_index(value_field)?;

    let mut order: Vec<String> = Vec::new();
    let mut series: HashMap<String, Vec<(i32, f64)>> = HashMap::new();

    for row in table.rows() {
        let (Some(group), Some(year)) = (row.cell(gi).key(), row.cell(yi).year()) else {
            continue;
        };
        let Some(v) = numeric(row.cell(vi), value_field)? else {
            continue;
        };
        if !series.contains_key(&group) {
            order.push(group.clone());
        }
        series.entry(group).or_default().push((year, v));
    }

    let mut scores = GroupScores::default();
    for group in order {
        match volatility(&series[&group]) {
            Ok(score) => scores.ranked.push((group, score)),
            Err(EngineError::InsufficientData { .. }) => scores.skipped.push(group),
            Err(e) => return Err(e),
        }
    }

    scores.ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(scores)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Cell;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn hhi_normalises_shares() {
        assert!(close(hhi(&[50.0, 30.0, 20.0]), 0.38));
    }

    #[test]
    fn hhi_zero_total_is_zero() {
        assert_eq!(hhi(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(hhi(&[]), 0.0);
    }

    #[test]
    fn hhi_single_region_is_total_concentration() {
        assert!(close(hhi(&[0.0, 42.0, 0.0, 0.0]), 1.0));
    }

    #[test]
    fn hhi_equal_shares() {
        assert!(close(hhi(&[7.0, 7.0, 7.0]), 1.0 / 3.0));
        assert!(close(hhi(&[1.0, 1.0, 1.0, 1.0]), 0.25));
    }

    #[test]
    fn volatility_skips_zero_previous() {
        // 0 -> 10 is skipped; 10 -> 20 is +100, 20 -> 10 is -50.
        let v = volatility(&[(2019, 0.0), (2020, 10.0), (2021, 20.0), (2022, 10.0)]).unwrap();
        assert!(close(v, 150.0));
    }

    #[test]
    fn volatility_needs_two_points() {
        assert!(matches!(
            volatility(&[(2020, 1.0)]),
            Err(EngineError::InsufficientData { .. })
        ));
        assert!(matches!(
            volatility(&[(2020, 0.0), (2021, 5.0)]),
            Err(EngineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn volatility_single_transition_is_zero() {
        assert_eq!(volatility(&[(2020, 10.0), (2021, 15.0)]).unwrap(), 0.0);
    }

    #[test]
    fn volatility_sorts_by_year() {
        let ordered = volatility(&[(2020, 10.0), (2021, 20.0), (2022, 15.0)]).unwrap();
        let shuffled = volatility(&[(2022, 15.0), (2020, 10.0), (2021, 20.0)]).unwrap();
        assert!(close(ordered, shuffled));
    }

    #[test]
    fn concentration_by_row_ranks_years() {
        let table = Table::from_records(
            "investment_by_region",
            &["year", "china", "united_states", "eu"],
            vec![
                vec![Cell::from(2021), Cell::from(10.0), Cell::from(10.0), Cell::from(10.0)],
                vec![Cell::from(2022), Cell::from(0.0), Cell::from(90.0), Cell::from(0.0)],
                vec![Cell::from(2023), Cell::from(5.0), Cell::Null, Cell::from(1.0)],
            ],
        );
        let regions = vec!["china".to_string(), "united_states".to_string(), "eu".to_string()];
        let scores = concentration_by_row(&table, "year", &regions).unwrap();
        assert_eq!(scores.ranked[0].0, "2022");
        assert!(close(scores.ranked[0].1, 1.0));
        assert!(close(scores.ranked[1].1, 1.0 / 3.0));
        assert_eq!(scores.skipped, vec!["2023"]);
    }

    #[test]
    fn concentration_by_row_missing_region_column() {
        let table = Table::from_records("t", &["year", "china"], vec![]);
        let regions = vec!["china".to_string(), "india".to_string()];
        let err = concentration_by_row(&table, "year", &regions).unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch { ref field, .. } if field == "india"));
    }

    #[test]
    fn volatility_by_group_ranks_and_skips() {
        let table = Table::from_records(
            "sectors",
            &["entity", "year", "amount_usd"],
            vec![
                vec![Cell::from("Robotics"), Cell::from(2021), Cell::from(10.0)],
                vec![Cell::from("Robotics"), Cell::from(2022), Cell::from(20.0)],
                vec![Cell::from("Robotics"), Cell::from(2023), Cell::from(10.0)],
                vec![Cell::from("Health"), Cell::from(2022), Cell::from(10.0)],
                vec![Cell::from("Health"), Cell::from(2023), Cell::from(11.0)],
                vec![Cell::from("Energy"), Cell::from(2023), Cell::from(3.0)],
            ],
        );
        let scores = volatility_by_group(&table, "entity", "year", "amount_usd").unwrap();
        assert_eq!(scores.ranked[0].0, "Robotics");
        assert!(close(scores.ranked[0].1, 150.0));
        assert_eq!(scores.ranked[1].0, "Health");
        assert_eq!(scores.skipped, vec!["Energy"]);
    }
}

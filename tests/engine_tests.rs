//! Integration tests for the derived-metrics engine through the public API.

use horizon::engine::{
    self, Aggregate, Dimension, Metric, hhi, max_value, volatility, year_over_year_delta,
};
use horizon::error::EngineError;
use horizon::store::{Cell, DatasetId, Table, TableCache};

fn yearly(rows: &[(i32, f64)]) -> Table {
    Table::from_records(
        "yearly",
        &["year", "value"],
        rows.iter()
            .map(|&(y, v)| vec![Cell::from(y), Cell::from(v)])
            .collect(),
    )
}

fn training_cost(rows: &[(&str, &str, &str, f64)]) -> Table {
    Table::from_records(
        "training_cost",
        &[
            "entity",
            "day",
            "domain",
            "organization_categorization",
            "cost__inflation_adjusted",
        ],
        rows.iter()
            .map(|&(entity, day, domain, cost)| {
                vec![
                    Cell::from(entity),
                    horizon::store::loader::parse_cell(day),
                    Cell::from(domain),
                    Cell::from("Industry"),
                    Cell::from(cost),
                ]
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[test]
fn yoy_delta_between_consecutive_years() {
    let table = yearly(&[(2022, 100.0), (2023, 150.0)]);
    let delta = year_over_year_delta(&table, "year", "value", Aggregate::Max).unwrap();
    assert!((delta - 50.0).abs() < 1e-9);

    let falling = yearly(&[(2022, 150.0), (2023, 100.0)]);
    let delta = year_over_year_delta(&falling, "year", "value", Aggregate::Max).unwrap();
    assert!((delta + 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn yoy_delta_needs_the_previous_year() {
    let table = yearly(&[(2020, 100.0), (2023, 150.0)]);
    let err = year_over_year_delta(&table, "year", "value", Aggregate::Sum).unwrap_err();
    assert!(matches!(err, EngineError::MissingYear { year: 2022 }));
}

#[test]
fn max_value_bounds_every_row() {
    let table = yearly(&[(2020, 3.0), (2021, 9.5), (2022, -1.0)]);
    let max = max_value(&table, "value").unwrap();
    for row in table.rows() {
        assert!(max >= row.cell(1).as_f64().unwrap());
    }
    assert_eq!(max, 9.5);
}

#[test]
fn max_value_on_empty_table_is_empty_input() {
    let table = Table::from_records("empty", &["value"], Vec::new());
    let err = max_value(&table, "value").unwrap_err();
    assert!(matches!(err, EngineError::EmptyInput { .. }));
}

// ---------------------------------------------------------------------------
// Concentration and volatility
// ---------------------------------------------------------------------------

#[test]
fn hhi_known_values() {
    assert!((hhi(&[50.0, 30.0, 20.0]) - 0.38).abs() < 1e-12);
    assert!((hhi(&[10.0, 20.0, 30.0]) - hhi(&[1.0, 2.0, 3.0])).abs() < 1e-12);
    assert!((hhi(&[4.0, 4.0, 4.0]) - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(hhi(&[0.0, 7.0, 0.0, 0.0]), 1.0);
    assert_eq!(hhi(&[0.0, 0.0]), 0.0);
}

#[test]
fn volatility_spread_of_growth_rates() {
    let v = volatility(&[
        (2019, 89.0),
        (2020, 100.0),
        (2021, 95.0),
        (2022, 80.0),
        (2023, 4000.0),
    ])
    .unwrap();
    assert!((v - 4915.79).abs() < 0.01, "got {v}");
}

#[test]
fn volatility_single_point_is_insufficient() {
    let err = volatility(&[(2023, 1.0)]).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientData { .. }));
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[test]
fn compare_domains_by_training_cost() {
    let mut cache = TableCache::new("/nonexistent");
    cache.insert(
        DatasetId::TrainingCost,
        training_cost(&[
            ("GPT-3", "2020-06-11", "Language", 4.0e6),
            ("PaLM", "2022-04-04", "Language", 5.0e7),
            ("ViT", "2021-01-01", "Vision", 1.0e6),
            ("Whisper", "2022-09-21", "Speech", 2.0e5),
            ("Old", "2012-01-01", "Vision", 9.9e9),
        ]),
    );

    let result = engine::compare(
        &mut cache,
        Dimension::Domain,
        Metric::TrainingCost,
        (2018, 2024),
    )
    .unwrap();

    let ranked: Vec<(&str, f64)> = result
        .rows
        .iter()
        .map(|r| (r.group.as_str(), r.value))
        .collect();
    assert_eq!(
        ranked,
        vec![("Language", 5.0e7), ("Vision", 1.0e6), ("Speech", 2.0e5)]
    );
    assert_eq!(result.insights.leader.as_ref().unwrap().group, "Language");
    assert_eq!(result.insights.trailing.as_ref().unwrap().group, "Speech");
    assert!((result.insights.top3_share.unwrap() - 100.0).abs() < 1e-9);

    for pair in result.rows.windows(2) {
        assert!(pair[0].value >= pair[1].value);
    }
}

#[test]
fn compare_unsupported_pair() {
    let mut cache = TableCache::new("/nonexistent");
    let err = engine::compare(
        &mut cache,
        Dimension::Country,
        Metric::Parameters,
        (2018, 2024),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedCombination { .. }));
}

#[test]
fn compare_inverted_range_is_empty_not_an_error() {
    let mut cache = TableCache::new("/nonexistent");
    cache.insert(
        DatasetId::TrainingCost,
        training_cost(&[("PaLM", "2022-04-04", "Language", 5.0e7)]),
    );
    let result = engine::compare(
        &mut cache,
        Dimension::Domain,
        Metric::TrainingCost,
        (2024, 2018),
    )
    .unwrap();
    assert!(result.is_empty());
    assert!(result.insights.leader.is_none());
}

#[test]
fn every_dimension_has_at_least_one_metric() {
    for d in Dimension::ALL {
        assert!(!engine::metrics_for(d).is_empty(), "{d}");
    }
    assert_eq!(engine::supported_pairs().len(), 8);
}

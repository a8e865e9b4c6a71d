use crate::config::HorizonConfig;
use crate::engine::{
    Aggregate, concentration_by_row, group_mean_ranked, latest_year_group_mean, latest_year_value,
    percent_change, percent_ratio, row_with_max, year_over_year_delta, yearly_series,
};
use crate::error::{EngineError, EngineResult};
use crate::store::catalog::OpinionCategory;
use crate::store::{DatasetId, Table, TableCache};

use super::{Kpi, Section, SectionReport, Unit, sector_volatility};

/// Compute every KPI of `section`. Never fails; see [`Kpi::compute`].
pub fn section_report(
    section: Section,
    cache: &mut TableCache,
    config: &HorizonConfig,
) -> SectionReport {
    let kpis = match section {
        Section::Development => development(cache),
        Section::Geographic => geographic(cache),
        Section::Innovation => innovation(cache),
        Section::Investment => investment(cache, config),
        Section::PublicView => public_view(cache),
    };

    SectionReport {
        section,
        title: section.title(),
        why_it_matters: section.why_it_matters(),
        kpis,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Entity name of the row holding the maximum of `value_field`.
fn leader_row(table: &Table, value_field: &str) -> EngineResult<(f64, Option<String>)> {
    let row = row_with_max(table, value_field)?;
    let value = table
        .value(row, value_field)?
        .as_f64()
        .ok_or_else(|| EngineError::empty(value_field))?;
    let label = table.value(row, "entity")?.key();
    Ok((value, label))
}

fn first_ranked(ranked: Vec<(String, f64)>, what: &str) -> EngineResult<(f64, Option<String>)> {
    ranked
        .into_iter()
        .next()
        .map(|(group, v)| (v, Some(group)))
        .ok_or_else(|| EngineError::empty(what))
}

fn yoy(
    cache: &mut TableCache,
    id: DatasetId,
    year_field: &str,
    value_field: &str,
    agg: Aggregate,
) -> EngineResult<(f64, Option<String>)> {
    let table = cache.dataset(id)?;
    let delta = year_over_year_delta(&table, year_field, value_field, agg)?;
    let latest = table.years(year_field)?.last().copied();
    Ok((delta, latest.map(|y| format!("{} vs {}", y, y - 1))))
}

// ---------------------------------------------------------------------------
// Development
// ---------------------------------------------------------------------------

fn development(cache: &mut TableCache) -> Vec<Kpi> {
    vec![
        Kpi::compute(
            "most_expensive_system",
            "Most expensive system to train",
            Unit::Usd,
            || {
                let table = cache.dataset(DatasetId::TrainingCost)?;
                leader_row(&table, "cost__inflation_adjusted")
            },
        ),
        Kpi::compute(
            "training_cost_yoy",
            "Peak training cost, year over year",
            Unit::Percent,
            || {
                yoy(
                    cache,
                    DatasetId::TrainingCost,
                    "day",
                    "cost__inflation_adjusted",
                    Aggregate::Max,
                )
            },
        ),
        Kpi::compute("largest_compute", "Largest training compute", Unit::Petaflop, || {
            let table = cache.dataset(DatasetId::Computation)?;
            leader_row(&table, "training_computation_petaflop")
        }),
        Kpi::compute("largest_dataset", "Largest training dataset", Unit::Datapoints, || {
            let table = cache.dataset(DatasetId::Datapoints)?;
            leader_row(&table, "training_dataset_size__datapoints")
        }),
        Kpi::compute("largest_model", "Largest parameter count", Unit::Parameters, || {
            let table = cache.dataset(DatasetId::Parameters)?;
            leader_row(&table, "parameters")
        }),
        Kpi::compute(
            "top_org_type_by_parameters",
            "Highest mean parameters by organization type",
            Unit::Parameters,
            || {
                let table = cache.dataset(DatasetId::Parameters)?;
                first_ranked(
                    group_mean_ranked(&table, "organization_categorization", "parameters")?,
                    "parameters",
                )
            },
        ),
    ]
}

// ---------------------------------------------------------------------------
// Geographic
// ---------------------------------------------------------------------------

/// Country with the highest cumulative count `offset` years before the
/// latest year.
fn leading_country(table: &Table, offset: u32) -> EngineResult<(f64, Option<String>)> {
    let means = latest_year_group_mean(table, "entity", "cumulative_count", "year", offset)?;
    // BTreeMap iterates alphabetically; ties go to the first name.
    let mut best: Option<(String, f64)> = None;
    for (country, v) in means {
        if best.as_ref().is_none_or(|(_, b)| v > *b) {
            best = Some((country, v));
        }
    }
    best.map(|(c, v)| (v, Some(c)))
        .ok_or_else(|| EngineError::empty("cumulative_count"))
}

fn geographic(cache: &mut TableCache) -> Vec<Kpi> {
    vec![
        Kpi::compute("leading_country", "Most large-scale AI systems", Unit::Count, || {
            let table = cache.dataset(DatasetId::CumulativeSystems)?;
            leading_country(&table, 0)
        }),
        Kpi::compute("previous_leader", "Leader the year before", Unit::Count, || {
            let table = cache.dataset(DatasetId::CumulativeSystems)?;
            leading_country(&table, 1)
        }),
        Kpi::compute(
            "systems_yoy",
            "Highest cumulative count, year over year",
            Unit::Percent,
            || {
                yoy(
                    cache,
                    DatasetId::CumulativeSystems,
                    "year",
                    "cumulative_count",
                    Aggregate::Max,
                )
            },
        ),
    ]
}

// ---------------------------------------------------------------------------
// Innovation
// ---------------------------------------------------------------------------

const APPLIED: &str = "num_patent_applications__field_all";
const GRANTED: &str = "num_patent_granted__field_all";

fn grant_ratio(table: &Table) -> EngineResult<(f64, Option<String>)> {
    let (year, applied) = latest_year_value(table, "year", APPLIED, Aggregate::Sum)?;
    let granted = yearly_series(table, "year", GRANTED, Aggregate::Sum)?
        .into_iter()
        .find(|&(y, _)| y == year)
        .map(|(_, v)| v)
        .ok_or(EngineError::MissingYear { year })?;
    Ok((percent_ratio(granted, applied)?, Some(year.to_string())))
}

fn innovation(cache: &mut TableCache) -> Vec<Kpi> {
    vec![
        Kpi::compute(
            "patent_applications_yoy",
            "Patent applications, year over year",
            Unit::Percent,
            || yoy(cache, DatasetId::PatentsWorld, "year", APPLIED, Aggregate::Sum),
        ),
        Kpi::compute(
            "grant_ratio",
            "Granted per application, latest year",
            Unit::Percent,
            || {
                let table = cache.dataset(DatasetId::PatentsWorld)?;
                grant_ratio(&table)
            },
        ),
        Kpi::compute(
            "top_industry",
            "Industry with most applications",
            Unit::Count,
            || {
                let table = cache.dataset(DatasetId::PatentsByIndustry)?;
                first_ranked(
                    group_mean_ranked(&table, "entity", "num_patent_applications")?,
                    "num_patent_applications",
                )
            },
        ),
    ]
}

// ---------------------------------------------------------------------------
// Investment
// ---------------------------------------------------------------------------

/// Concentration of the latest year over the configured regions.
fn latest_concentration(
    table: &Table,
    config: &HorizonConfig,
) -> EngineResult<(f64, Option<String>)> {
    let key_field = config.concentration.key_field.as_str();
    let latest = table
        .years(key_field)?
        .last()
        .copied()
        .ok_or_else(|| EngineError::empty(key_field))?;
    let latest_rows = table.filter_years(key_field, latest, latest)?;

    let scores = concentration_by_row(&latest_rows, key_field, &config.concentration.regions)?;
    scores
        .ranked
        .into_iter()
        .next()
        .map(|(key, v)| (v, Some(key)))
        .ok_or_else(|| {
            EngineError::insufficient(format!("no complete region shares for {latest}"))
        })
}

fn investment(cache: &mut TableCache, config: &HorizonConfig) -> Vec<Kpi> {
    vec![
        Kpi::compute(
            "world_investment_yoy",
            "World private investment, year over year",
            Unit::Percent,
            || yoy(cache, DatasetId::InvestmentByRegion, "year", "world", Aggregate::Sum),
        ),
        Kpi::compute(
            "investment_concentration",
            "Regional concentration (HHI)",
            Unit::Index,
            || {
                let table = cache.dataset(DatasetId::InvestmentByRegion)?;
                latest_concentration(&table, config)
            },
        ),
        Kpi::compute(
            "most_volatile_sector",
            "Most volatile focus area",
            Unit::PercentPoints,
            || first_ranked(sector_volatility(cache)?.ranked, "amount_usd"),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Public view
// ---------------------------------------------------------------------------

/// Percent of all responses in `year` that fall into `category`.
fn opinion_share(table: &Table, category: &OpinionCategory, year: i32) -> EngineResult<f64> {
    let oi = table.column_index("opinion")?;
    let ci = table.column_index("opinion_count")?;
    let yi = table.column_index("year")?;

    let mut total = 0.0;
    let mut matching = 0.0;
    let mut seen = false;
    for row in table.rows() {
        if row.cell(yi).year() != Some(year) {
            continue;
        }
        seen = true;
        let Some(count) = row.cell(ci).as_f64() else {
            continue;
        };
        total += count;
        if row
            .cell(oi)
            .key()
            .is_some_and(|label| &OpinionCategory::parse(&label) == category)
        {
            matching += count;
        }
    }

    if !seen {
        return Err(EngineError::MissingYear { year });
    }
    percent_ratio(matching, total)
}

fn worried_shares(table: &Table) -> EngineResult<(i32, f64, f64)> {
    let latest = table
        .years("year")?
        .last()
        .copied()
        .ok_or_else(|| EngineError::empty("year"))?;
    let now = opinion_share(table, &OpinionCategory::Worried, latest)?;
    let before = opinion_share(table, &OpinionCategory::Worried, latest - 1)?;
    Ok((latest, now, before))
}

fn most_optimistic(table: &Table) -> EngineResult<(f64, Option<String>)> {
    let oi = table.column_index("opinion")?;
    let helpful = table.filter(|row| {
        row.cell(oi)
            .key()
            .is_some_and(|l| OpinionCategory::parse(&l) == OpinionCategory::MostlyHelpful)
    });
    first_ranked(group_mean_ranked(&helpful, "entity", "percent")?, "percent")
}

fn public_view(cache: &mut TableCache) -> Vec<Kpi> {
    vec![
        Kpi::compute(
            "worried_share",
            "Worried about automation, latest year",
            Unit::Percent,
            || {
                let table = cache.dataset(DatasetId::AutomationSurvey)?;
                let (year, now, _) = worried_shares(&table)?;
                Ok((now, Some(year.to_string())))
            },
        ),
        Kpi::compute(
            "worried_share_change",
            "Change in worried share",
            Unit::PercentPoints,
            || {
                let table = cache.dataset(DatasetId::AutomationSurvey)?;
                let (year, now, before) = worried_shares(&table)?;
                Ok((now - before, Some(format!("{} vs {}", year, year - 1))))
            },
        ),
        Kpi::compute(
            "worried_share_growth",
            "Relative growth of worried share",
            Unit::Percent,
            || {
                let table = cache.dataset(DatasetId::AutomationSurvey)?;
                let (_, now, before) = worried_shares(&table)?;
                Ok((percent_change(now, before)?, None))
            },
        ),
        Kpi::compute(
            "most_optimistic_country",
            "Most optimistic country",
            Unit::Percent,
            || {
                let table = cache.dataset(DatasetId::ViewByCountry)?;
                most_optimistic(&table)
            },
        ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::KpiValue;
    use crate::store::Cell;
    use crate::store::loader::parse_cell;

    fn cache_with(tables: Vec<(DatasetId, Table)>) -> TableCache {
        let mut cache = TableCache::new("/nonexistent");
        for (id, table) in tables {
            cache.insert(id, table);
        }
        cache
    }

    fn survey() -> Table {
        let row = |y: i32, op: &str, n: f64| -> Vec<Cell> {
            vec!["18-29".into(), y.into(), op.into(), n.into()]
        };
        Table::from_records(
            "automation_survey",
            &["entity", "year", "opinion", "opinion_count"],
            vec![
                row(2022, "Worried", 20.0),
                row(2022, "Not Worried", 80.0),
                row(2023, "Worried", 30.0),
                row(2023, "Not Worried", 60.0),
                row(2023, "Don't Know", 10.0),
            ],
        )
    }

    #[test]
    fn missing_datasets_blank_only_their_kpis() {
        let mut cache = cache_with(vec![(DatasetId::AutomationSurvey, survey())]);
        let report = section_report(Section::PublicView, &mut cache, &HorizonConfig::default());

        let worried = report.kpi("worried_share").unwrap();
        assert!((worried.value.value().unwrap() - 30.0).abs() < 1e-9);
        let change = report.kpi("worried_share_change").unwrap();
        assert!((change.value.value().unwrap() - 10.0).abs() < 1e-9);
        let growth = report.kpi("worried_share_growth").unwrap();
        assert!((growth.value.value().unwrap() - 50.0).abs() < 1e-9);

        let optimistic = report.kpi("most_optimistic_country").unwrap();
        match &optimistic.value {
            KpiValue::Unavailable { kind, .. } => assert_eq!(kind, "dataset_not_found"),
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert_eq!(report.unavailable(), 1);
    }

    #[test]
    fn investment_concentration_uses_latest_year() {
        let table = Table::from_records(
            "investment_by_region",
            &["year", "world", "china", "united_states", "european_union_and_united_kingdom"],
            vec![
                vec![2022.into(), 200.0.into(), 50.0.into(), 30.0.into(), 20.0.into()],
                vec![2023.into(), 150.0.into(), 10.0.into(), 10.0.into(), 10.0.into()],
            ],
        );
        let mut cache = cache_with(vec![(DatasetId::InvestmentByRegion, table)]);
        let report = section_report(Section::Investment, &mut cache, &HorizonConfig::default());

        let hhi = report.kpi("investment_concentration").unwrap();
        assert!((hhi.value.value().unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(hhi.value.label(), Some("2023"));

        let yoy = report.kpi("world_investment_yoy").unwrap();
        assert!((yoy.value.value().unwrap() + 25.0).abs() < 1e-9);
    }

    #[test]
    fn geographic_leaders_by_year() {
        let row = |c: &str, y: i32, n: f64| vec![Cell::from(c), y.into(), n.into()];
        let table = Table::from_records(
            "cumulative_systems",
            &["entity", "year", "cumulative_count"],
            vec![
                row("China", 2022, 40.0),
                row("United States", 2022, 35.0),
                row("China", 2023, 50.0),
                row("United States", 2023, 70.0),
            ],
        );
        let mut cache = cache_with(vec![(DatasetId::CumulativeSystems, table)]);
        let report = section_report(Section::Geographic, &mut cache, &HorizonConfig::default());

        assert_eq!(report.kpi("leading_country").unwrap().value.label(), Some("United States"));
        assert_eq!(report.kpi("previous_leader").unwrap().value.label(), Some("China"));
        let yoy = report.kpi("systems_yoy").unwrap().value.value().unwrap();
        assert!((yoy - 75.0).abs() < 1e-9);
    }

    fn metric_rows(value_field: &str, rows: &[(&str, &str, &str, f64)]) -> Table {
        Table::from_records(
            "metric",
            &["entity", "day", "domain", "organization_categorization", value_field],
            rows.iter()
                .map(|&(entity, day, org, v)| {
                    vec![
                        Cell::from(entity),
                        parse_cell(day),
                        Cell::from("Language"),
                        Cell::from(org),
                        Cell::from(v),
                    ]
                })
                .collect(),
        )
    }

    fn value_of(report: &SectionReport, key: &str) -> f64 {
        report.kpi(key).unwrap().value.value().unwrap()
    }

    #[test]
    fn training_cost_yoy_groups_dates_by_year() {
        let table = metric_rows(
            "cost__inflation_adjusted",
            &[
                ("A", "2022-05-01", "Industry", 100.0),
                ("B", "2022-09-01", "Industry", 80.0),
                ("C", "2023-02-01", "Industry", 150.0),
                ("D", "2023-07-01", "Academia", 120.0),
            ],
        );
        let mut cache = cache_with(vec![(DatasetId::TrainingCost, table)]);
        let report = section_report(Section::Development, &mut cache, &HorizonConfig::default());

        let yoy = report.kpi("training_cost_yoy").unwrap();
        assert!((yoy.value.value().unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(yoy.value.label(), Some("2023 vs 2022"));

        let top = report.kpi("most_expensive_system").unwrap();
        assert_eq!(top.value.value(), Some(150.0));
        assert_eq!(top.value.label(), Some("C"));
    }

    #[test]
    fn top_org_type_ranks_by_mean_parameters() {
        let table = metric_rows(
            "parameters",
            &[
                ("A", "2021-01-01", "Industry", 10.0),
                ("B", "2022-01-01", "Industry", 30.0),
                ("C", "2022-06-01", "Academia", 40.0),
                ("D", "2023-01-01", "Academia", 60.0),
            ],
        );
        let mut cache = cache_with(vec![(DatasetId::Parameters, table)]);
        let report = section_report(Section::Development, &mut cache, &HorizonConfig::default());

        let top = report.kpi("top_org_type_by_parameters").unwrap();
        assert!((top.value.value().unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(top.value.label(), Some("Academia"));
        assert_eq!(report.kpi("largest_model").unwrap().value.label(), Some("D"));
    }

    #[test]
    fn innovation_kpis_from_patent_tables() {
        let world = Table::from_records(
            "patents_world",
            &["year", APPLIED, GRANTED],
            vec![
                vec![2021.into(), 100.0.into(), 40.0.into()],
                vec![2022.into(), 120.0.into(), 60.0.into()],
                vec![2022.into(), 30.0.into(), 0.0.into()],
            ],
        );
        let row = |e: &str, y: i32, n: f64| vec![Cell::from(e), y.into(), n.into()];
        let industry = Table::from_records(
            "patents_by_industry",
            &["entity", "year", "num_patent_applications"],
            vec![
                row("Transport", 2021, 10.0),
                row("Transport", 2022, 30.0),
                row("Banking", 2021, 25.0),
            ],
        );
        let mut cache = cache_with(vec![
            (DatasetId::PatentsWorld, world),
            (DatasetId::PatentsByIndustry, industry),
        ]);
        let report = section_report(Section::Innovation, &mut cache, &HorizonConfig::default());

        assert!((value_of(&report, "patent_applications_yoy") - 50.0).abs() < 1e-9);
        assert_eq!(
            report.kpi("patent_applications_yoy").unwrap().value.label(),
            Some("2022 vs 2021")
        );
        assert!((value_of(&report, "grant_ratio") - 40.0).abs() < 1e-9);

        let top = report.kpi("top_industry").unwrap();
        assert!((top.value.value().unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(top.value.label(), Some("Banking"));
        assert_eq!(report.unavailable(), 0);
    }

    #[test]
    fn most_optimistic_country_averages_helpful_share() {
        let row = |e: &str, y: i32, op: &str, p: f64| {
            vec![Cell::from(e), y.into(), Cell::from(op), p.into()]
        };
        let table = Table::from_records(
            "view_by_country",
            &["entity", "year", "opinion", "percent"],
            vec![
                row("Brazil", 2021, "Mostly Helpful", 60.0),
                row("Brazil", 2021, "Mostly Harmful", 30.0),
                row("Japan", 2019, "Mostly Helpful", 40.0),
                row("Japan", 2021, "Mostly Helpful", 50.0),
                row("Kenya", 2021, "Mostly Harmful", 90.0),
            ],
        );
        let mut cache = cache_with(vec![(DatasetId::ViewByCountry, table)]);
        let report = section_report(Section::PublicView, &mut cache, &HorizonConfig::default());

        let top = report.kpi("most_optimistic_country").unwrap();
        assert!((top.value.value().unwrap() - 60.0).abs() < 1e-9);
        assert_eq!(top.value.label(), Some("Brazil"));
        assert!(matches!(
            report.kpi("worried_share").unwrap().value,
            KpiValue::Unavailable { data_gap: true, .. }
        ));
    }

    #[test]
    fn grant_ratio_needs_matching_year() {
        let table = Table::from_records(
            "patents_world",
            &["year", APPLIED, GRANTED],
            vec![
                vec![2021.into(), 100.0.into(), 40.0.into()],
                vec![2022.into(), 200.0.into(), Cell::Null],
            ],
        );
        assert!(matches!(
            grant_ratio(&table).unwrap_err(),
            EngineError::MissingYear { year: 2022 }
        ));
    }
}

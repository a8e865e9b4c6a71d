//! Dashboard sections: thin callers that turn engine results into the KPI
//! panels of each page.
//!
//! A section never fails as a whole: each KPI captures its own engine error
//! as [`KpiValue::Unavailable`], so one missing dataset only blanks the
//! panels that depend on it.

pub mod sections;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::HorizonConfig;
use crate::engine::{GroupScores, concentration_by_row, volatility_by_group};
use crate::error::EngineResult;
use crate::store::{DatasetId, TableCache};

pub use sections::section_report;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Development,
    Geographic,
    Innovation,
    Investment,
    PublicView,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Self::Development,
        Self::Geographic,
        Self::Innovation,
        Self::Investment,
        Self::PublicView,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "development" | "dev" | "aidevelopment" => Some(Self::Development),
            "geographic" | "geo" | "geographicdistribution" => Some(Self::Geographic),
            "innovation" | "patents" => Some(Self::Innovation),
            "investment" => Some(Self::Investment),
            "publicview" | "public" | "opinion" => Some(Self::PublicView),
            _ => None,
        }
    }

    /// URL / CLI slug.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Geographic => "geographic",
            Self::Innovation => "innovation",
            Self::Investment => "investment",
            Self::PublicView => "public-view",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Development => "AI Development",
            Self::Geographic => "Geographic Distribution",
            Self::Innovation => "Innovation",
            Self::Investment => "Investment",
            Self::PublicView => "Public View",
        }
    }

    /// The "why this matters" blurb shown above the section.
    pub fn why_it_matters(self) -> &'static str {
        match self {
            Self::Development => {
                "Understanding the resources required to develop AI systems helps us assess \
                 who can participate in AI development and how access to these technologies \
                 might be distributed."
            }
            Self::Geographic => {
                "Where large-scale AI systems are built shapes which countries set the pace \
                 of the technology and whose priorities it reflects."
            }
            Self::Innovation => {
                "Patent applications and grants show how quickly AI research turns into \
                 intellectual property claims, and in which industries."
            }
            Self::Investment => {
                "Private investment shows the competitive landscape of AI funding and how \
                 concentrated it is among a few regions."
            }
            Self::PublicView => {
                "Public concern about automation and attitudes towards AI vary by age group \
                 and country, and shape how the technology is received."
            }
        }
    }

    /// Datasets the section's KPIs read.
    pub fn datasets(self) -> &'static [DatasetId] {
        match self {
            Self::Development => &[
                DatasetId::TrainingCost,
                DatasetId::Computation,
                DatasetId::Datapoints,
                DatasetId::Parameters,
            ],
            Self::Geographic => &[DatasetId::CumulativeSystems],
            Self::Innovation => &[DatasetId::PatentsWorld, DatasetId::PatentsByIndustry],
            Self::Investment => &[DatasetId::InvestmentByRegion, DatasetId::InvestmentBySector],
            Self::PublicView => &[DatasetId::AutomationSurvey, DatasetId::ViewByCountry],
        }
    }
}

// ---------------------------------------------------------------------------
// KPI values
// ---------------------------------------------------------------------------

/// What a KPI number measures. Formatting is up to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Usd,
    Count,
    Percent,
    /// Difference between two percentages.
    PercentPoints,
    Petaflop,
    Datapoints,
    Parameters,
    /// Dimensionless score such as a concentration index.
    Index,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KpiValue {
    Available {
        value: f64,
        unit: Unit,
        /// Who or what the value belongs to, e.g. the leading country.
        label: Option<String>,
    },
    Unavailable {
        kind: String,
        reason: String,
        /// Sparse or absent data, shown as "N/A". Otherwise the dataset or
        /// request is broken.
        data_gap: bool,
    },
}

impl KpiValue {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Available { value, .. } => Some(*value),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Available { label, .. } => label.as_deref(),
            Self::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Kpi {
    pub key: &'static str,
    pub title: &'static str,
    #[serde(flatten)]
    pub value: KpiValue,
}

impl Kpi {
    /// Evaluate `f`, capturing any engine error as an unavailable value.
    pub(crate) fn compute(
        key: &'static str,
        title: &'static str,
        unit: Unit,
        f: impl FnOnce() -> EngineResult<(f64, Option<String>)>,
    ) -> Self {
        let value = match f() {
            Ok((value, label)) => KpiValue::Available { value, unit, label },
            Err(e) => KpiValue::Unavailable {
                kind: e.kind().to_string(),
                reason: e.to_string(),
                data_gap: e.is_data_gap(),
            },
        };
        Self { key, title, value }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub section: Section,
    pub title: &'static str,
    pub why_it_matters: &'static str,
    pub kpis: Vec<Kpi>,
}

impl SectionReport {
    pub fn unavailable(&self) -> usize {
        self.kpis.iter().filter(|k| !k.value.is_available()).count()
    }

    pub fn kpi(&self, key: &str) -> Option<&Kpi> {
        self.kpis.iter().find(|k| k.key == key)
    }
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

const SPOTLIGHT_FINDING: &str = "The cost to train state-of-the-art AI systems has increased \
    100x in the last 5 years, with language models now costing over $100 million to train. \
    This rapid escalation raises important questions about equitable access to AI development \
    capabilities.";

#[derive(Debug, Clone, Serialize)]
pub struct Spotlight {
    /// ISO week number of the day the overview was built.
    pub week: u32,
    pub finding: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub section: Section,
    pub slug: &'static str,
    pub title: &'static str,
    pub why_it_matters: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub spotlight: Spotlight,
    pub sections: Vec<SectionSummary>,
}

pub fn overview(today: NaiveDate) -> Overview {
    Overview {
        title: "AI Horizon Scanner",
        subtitle: "Democratizing AI Development Knowledge",
        spotlight: Spotlight {
            week: today.iso_week().week(),
            finding: SPOTLIGHT_FINDING,
        },
        sections: Section::ALL
            .iter()
            .map(|&s| SectionSummary {
                section: s,
                slug: s.slug(),
                title: s.title(),
                why_it_matters: s.why_it_matters(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// Investment concentration per year over the configured regions.
pub fn investment_concentration(
    cache: &mut TableCache,
    config: &HorizonConfig,
) -> EngineResult<GroupScores> {
    let table = cache.dataset(DatasetId::InvestmentByRegion)?;
    concentration_by_row(
        &table,
        &config.concentration.key_field,
        &config.concentration.regions,
    )
}

/// Volatility of private investment per focus area.
pub fn sector_volatility(cache: &mut TableCache) -> EngineResult<GroupScores> {
    let table = cache.dataset(DatasetId::InvestmentBySector)?;
    volatility_by_group(&table, "entity", "year", "amount_usd")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Dataset catalog: the fixed set of logical tables the dashboard reads.
//!
//! Each dataset maps to one file in the data directory (`<stem>.csv`,
//! `<stem>.json` or `<stem>.jsonl`) and declares the columns it must carry.
//! Categorical columns are parsed into enums that tolerate unknown labels.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::loader::FileFormat;
use super::Table;
use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// Dataset ids
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetId {
    TrainingCost,
    Computation,
    Datapoints,
    Parameters,
    CumulativeSystems,
    PatentsByCountry,
    PatentsWorld,
    PatentsByIndustry,
    InvestmentByRegion,
    InvestmentBySector,
    AutomationSurvey,
    ViewByCountry,
}

/// Columns shared by every training-run metric table.
const METRIC_ROW: [&str; 4] = ["entity", "day", "domain", "organization_categorization"];

impl DatasetId {
    pub const ALL: [DatasetId; 12] = [
        Self::TrainingCost,
        Self::Computation,
        Self::Datapoints,
        Self::Parameters,
        Self::CumulativeSystems,
        Self::PatentsByCountry,
        Self::PatentsWorld,
        Self::PatentsByIndustry,
        Self::InvestmentByRegion,
        Self::InvestmentBySector,
        Self::AutomationSurvey,
        Self::ViewByCountry,
    ];

    /// File name without extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::TrainingCost => "training_cost",
            Self::Computation => "computation",
            Self::Datapoints => "datapoints",
            Self::Parameters => "parameters",
            Self::CumulativeSystems => "cumulative_systems",
            Self::PatentsByCountry => "patents_by_country",
            Self::PatentsWorld => "patents_world",
            Self::PatentsByIndustry => "patents_by_industry",
            Self::InvestmentByRegion => "investment_by_region",
            Self::InvestmentBySector => "investment_by_sector",
            Self::AutomationSurvey => "automation_survey",
            Self::ViewByCountry => "view_by_country",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::TrainingCost => "Cost to train AI systems",
            Self::Computation => "Computation used to train AI systems",
            Self::Datapoints => "Datapoints used to train AI systems",
            Self::Parameters => "Parameters of AI systems",
            Self::CumulativeSystems => "Cumulative large-scale AI systems by country",
            Self::PatentsByCountry => "AI patent applications by country",
            Self::PatentsWorld => "Worldwide AI patents by status",
            Self::PatentsByIndustry => "AI patent applications by industry",
            Self::InvestmentByRegion => "Annual private investment in AI by location",
            Self::InvestmentBySector => "Private investment in AI by focus area",
            Self::AutomationSurvey => "Opinion about work being automated",
            Self::ViewByCountry => "Views of AI by country",
        }
    }

    /// The value column a training-run metric table is measured in.
    pub fn metric_column(self) -> Option<&'static str> {
        match self {
            Self::TrainingCost => Some("cost__inflation_adjusted"),
            Self::Computation => Some("training_computation_petaflop"),
            Self::Datapoints => Some("training_dataset_size__datapoints"),
            Self::Parameters => Some("parameters"),
            _ => None,
        }
    }

    /// Columns the file must provide. Region columns of the wide investment
    /// table come from configuration and are checked where they are used.
    pub fn required_columns(self) -> Vec<&'static str> {
        if let Some(metric) = self.metric_column() {
            let mut cols = METRIC_ROW.to_vec();
            cols.push(metric);
            return cols;
        }
        match self {
            Self::CumulativeSystems => vec!["entity", "year", "cumulative_count"],
            Self::PatentsByCountry => vec!["entity", "num_patent_applications"],
            Self::PatentsWorld => vec![
                "year",
                "num_patent_applications__field_all",
                "num_patent_granted__field_all",
            ],
            Self::PatentsByIndustry => vec!["entity", "year", "num_patent_applications"],
            Self::InvestmentByRegion => vec!["year", "world"],
            Self::InvestmentBySector => vec!["entity", "year", "amount_usd"],
            Self::AutomationSurvey => vec!["entity", "year", "opinion", "opinion_count"],
            Self::ViewByCountry => vec!["entity", "year", "opinion", "percent"],
            _ => Vec::new(),
        }
    }

    /// Categorical columns parsed into [`Domain`], [`OrgCategory`] or
    /// [`OpinionCategory`].
    pub fn label_columns(self) -> &'static [&'static str] {
        if self.metric_column().is_some() {
            return &["domain", "organization_categorization"];
        }
        match self {
            Self::AutomationSurvey | Self::ViewByCountry => &["opinion"],
            _ => &[],
        }
    }

    /// Validate a freshly loaded table against this dataset's schema.
    pub fn check(self, table: &Table) -> EngineResult<()> {
        table.require_columns(&self.required_columns())
    }

    /// Locate the dataset file in `dir`, trying each supported extension.
    pub fn locate(self, dir: &Path) -> Option<PathBuf> {
        FileFormat::EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{ext}", self.file_stem())))
            .find(|p| p.is_file())
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

// ---------------------------------------------------------------------------
// Categorical columns
// ---------------------------------------------------------------------------

/// Application domain of an AI system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Domain {
    Language,
    Speech,
    Vision,
    ImageGeneration,
    Multimodal,
    Biology,
    Games,
    Other(String),
}

impl Domain {
    pub fn parse(label: &str) -> Self {
        match normalise(label).as_str() {
            "language" => Self::Language,
            "speech" => Self::Speech,
            "vision" => Self::Vision,
            "imagegeneration" => Self::ImageGeneration,
            "multimodal" | "multipledomains" => Self::Multimodal,
            "biology" => Self::Biology,
            "games" => Self::Games,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Kind of organisation behind an AI system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrgCategory {
    Academia,
    Industry,
    Collaboration,
    Other(String),
}

impl OrgCategory {
    pub fn parse(label: &str) -> Self {
        match normalise(label).as_str() {
            "academia" => Self::Academia,
            "industry" => Self::Industry,
            "academiaindustrycollab" | "collab" | "collaboration" => Self::Collaboration,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Survey answer category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpinionCategory {
    MostlyHelpful,
    MostlyHarmful,
    Neither,
    NoOpinion,
    Worried,
    VeryWorried,
    NotWorried,
    FeelSafe,
    NotFeelSafe,
    DontKnow,
    NoResponse,
    Other(String),
}

impl OpinionCategory {
    pub fn parse(label: &str) -> Self {
        match normalise(label).as_str() {
            "mostlyhelpful" => Self::MostlyHelpful,
            "mostlyharmful" => Self::MostlyHarmful,
            "neither" => Self::Neither,
            "noopinion" => Self::NoOpinion,
            "worried" => Self::Worried,
            "veryworried" => Self::VeryWorried,
            "notworried" => Self::NotWorried,
            "feelsafe" => Self::FeelSafe,
            "notfeelsafe" => Self::NotFeelSafe,
            "dontknow" => Self::DontKnow,
            "noresponse" => Self::NoResponse,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Lowercase and drop everything but letters, so `"Don't Know"`,
/// `"dont_know"` and `"DONT KNOW"` compare equal.
fn normalise(label: &str) -> String {
    label
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Distinct labels in `field` that none of the category enums recognise.
/// Unknown labels are kept in the data; this only reports them.
pub fn unknown_labels(table: &Table, field: &str) -> EngineResult<Vec<String>> {
    let idx = table.column_index(field)?;
    let mut unknown: Vec<String> = Vec::new();

    for row in table.rows() {
        let Some(label) = row.cell(idx).key() else {
            continue;
        };
        let known = match field {
            "domain" => Domain::parse(&label).is_known(),
            "organization_categorization" => OrgCategory::parse(&label).is_known(),
            "opinion" => OpinionCategory::parse(&label).is_known(),
            _ => true,
        };
        if !known && !unknown.contains(&label) {
            unknown.push(label);
        }
    }

    Ok(unknown)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

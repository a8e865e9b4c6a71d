//! Typed errors for the record store and the derived-metrics engine.
//!
//! Every variant is a local condition the caller can recover from. The engine
//! never masks missing data with a default value; turning an error into
//! "N/A" or "No data available" is left to the presentation layer.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no usable rows for '{field}'")]
    EmptyInput { field: String },
    #[error("division by zero: {context}")]
    DivisionByZero { context: String },
    #[error("no rows for year {year}")]
    MissingYear { year: i32 },
    #[error("insufficient data: {message}")]
    InsufficientData { message: String },
    #[error("unsupported combination: {dimension} by {metric}")]
    UnsupportedCombination { dimension: String, metric: String },
    #[error("schema mismatch on '{field}': {message}")]
    SchemaMismatch { field: String, message: String },
    #[error("dataset '{dataset}' not found under {}", dir.display())]
    DatasetNotFound { dataset: String, dir: PathBuf },
    #[error("failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
}

impl EngineError {
    pub fn empty(field: impl Into<String>) -> Self {
        Self::EmptyInput {
            field: field.into(),
        }
    }

    pub fn division_by_zero(context: impl Into<String>) -> Self {
        Self::DivisionByZero {
            context: context.into(),
        }
    }

    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.into(),
            message: "field not present".to_string(),
        }
    }

    pub fn schema(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable snake_case tag used by the HTTP API and the activity log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput { .. } => "empty_input",
            Self::DivisionByZero { .. } => "division_by_zero",
            Self::MissingYear { .. } => "missing_year",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::UnsupportedCombination { .. } => "unsupported_combination",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::DatasetNotFound { .. } => "dataset_not_found",
            Self::Load { .. } => "load_error",
        }
    }

    /// Whether the error reflects sparse or absent data rather than a
    /// misconfigured request. The UI shows these as "N/A".
    pub fn is_data_gap(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput { .. }
                | Self::DivisionByZero { .. }
                | Self::MissingYear { .. }
                | Self::InsufficientData { .. }
                | Self::DatasetNotFound { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::EngineError;

    #[test]
    fn helper_constructors_set_variants() {
        let err = EngineError::empty("value");
        assert!(matches!(err, EngineError::EmptyInput { .. }));
        let err = EngineError::division_by_zero("previous year");
        assert!(matches!(err, EngineError::DivisionByZero { .. }));
        let err = EngineError::insufficient("one point");
        assert!(matches!(err, EngineError::InsufficientData { .. }));
        let err = EngineError::missing_field("domain");
        assert!(matches!(err, EngineError::SchemaMismatch { .. }));
    }

    #[test]
    fn schema_mismatch_names_the_field() {
        let err = EngineError::missing_field("cost__inflation_adjusted");
        assert!(err.to_string().contains("cost__inflation_adjusted"));
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(EngineError::MissingYear { year: 2022 }.kind(), "missing_year");
        assert_eq!(
            EngineError::UnsupportedCombination {
                dimension: "country".into(),
                metric: "parameters".into(),
            }
            .kind(),
            "unsupported_combination"
        );
    }

    #[test]
    fn unsupported_combination_is_not_a_data_gap() {
        let err = EngineError::UnsupportedCombination {
            dimension: "country".into(),
            metric: "parameters".into(),
        };
        assert!(!err.is_data_gap());
        assert!(EngineError::MissingYear { year: 2020 }.is_data_gap());
    }
}

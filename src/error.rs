use thiserror::Error;

/// Failure kinds for every calculation in this crate.
///
/// A failed call never yields a partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmiError {
    /// The loan terms break the input contract (non-positive amount, negative rate,
    /// non-positive or sub-month term, or a non-finite value).
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The computation produced a value that is not finite.
    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl EmiError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EmiError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EmiError {
    fn from(e: serde_json::Error) -> Self {
        EmiError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for EmiError {
    fn from(e: csv::Error) -> Self {
        EmiError::Export(e.to_string())
    }
}

impl From<std::io::Error> for EmiError {
    fn from(e: std::io::Error) -> Self {
        EmiError::Export(e.to_string())
    }
}

/// Result alias used across the crate.
pub type EmiResult<T> = Result<T, EmiError>;

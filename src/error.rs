//! Error types for the financial insight service

use thiserror::Error;

/// Result type alias for insight operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Problems with the uploaded CSV itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("Invalid value {value:?} in column '{column}' at line {line}: {reason}")]
    InvalidValue {
        column: String,
        line: u64,
        value: String,
        reason: String,
    },

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Amounts in '{column}' are too large to add up")]
    AmountTooLarge { column: String },
}

impl ValidationError {
    /// Column the error refers to, if any
    pub fn column(&self) -> Option<&str> {
        match self {
            ValidationError::MissingColumn { column } => Some(column),
            ValidationError::InvalidValue { column, .. } => Some(column),
            ValidationError::AmountTooLarge { column } => Some(column),
            ValidationError::MalformedRow { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum InsightError {

    // =============================
    // Analysis Pipeline Errors
    // =============================

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("No data to analyze")]
    EmptyDataset,

    // =============================
    // Chat Feature Errors
    // =============================

    #[error("Prompt context too large: {size} characters exceeds limit of {limit}")]
    ContextTooLarge { size: usize, limit: usize },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Feature unavailable: {0}")]
    FeatureUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl InsightError {
    /// Errors caused by the uploaded data rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            InsightError::Validation(_)
                | InsightError::EmptyDataset
                | InsightError::InvalidRequest(_)
                | InsightError::CsvError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_column() {
        let err = InsightError::from(ValidationError::MissingColumn {
            column: "Rent".to_string(),
        });
        assert!(err.to_string().contains("'Rent'"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_external_errors_are_not_client_errors() {
        assert!(!InsightError::ExternalService("timeout".into()).is_client_error());
        assert!(!InsightError::ContextTooLarge { size: 10, limit: 5 }.is_client_error());
    }

    #[test]
    fn test_overflow_is_a_client_error() {
        let err = InsightError::from(ValidationError::AmountTooLarge {
            column: "Income".to_string(),
        });
        assert!(err.is_client_error());
        assert!(err.to_string().contains("'Income'"));
    }
}

//! Error types for Rusty-Retail

use thiserror::Error;

/// Main error type for Rusty-Retail
#[derive(Error, Debug)]
pub enum RetailError {
    #[error("Data unavailable: no reference data for category '{category}'")]
    DataUnavailable { category: String },

    #[error("Insufficient history: category '{category}' has no sales data points")]
    InsufficientHistory { category: String },

    #[error("Malformed input: {field} {reason}")]
    MalformedInput { field: String, reason: String },

    #[error("Narrative unavailable for {stage} stage: {reason}")]
    NarrativeUnavailable { stage: String, reason: String },

    #[error("Calendar error: {0}")]
    CalendarError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl RetailError {
    /// Shorthand for a `MalformedInput` error
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RetailError::MalformedInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error is advisory and recovered locally by its stage
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RetailError::NarrativeUnavailable { .. })
    }
}

/// Result type alias for Rusty-Retail operations
pub type Result<T> = std::result::Result<T, RetailError>;

//! Error types for the reporting pipeline.
//!
//! Errors fall into four families with different handling:
//!
//! - [`ValidationError`] is fatal and raised before any processing starts.
//!   Its message is surfaced to the caller verbatim.
//! - [`CleaningWarning`] is never an error. Warnings accumulate on the
//!   [`QualityReport`](crate::types::QualityReport) and processing continues.
//! - [`RenderError`] is handled where it happens: the report builders replace
//!   the chart with a placeholder note.
//! - [`ReportingError`] is the crate-level error returned by fallible
//!   operations. `ContractViolation` marks internal inconsistencies that must
//!   never be papered over.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fieldless tag of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    TooLarge,
    TooFewColumns,
    TooFewRows,
    UnsupportedFormat,
    CorruptFile,
}

/// Structural precondition failure found by the validator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("File is too large: {size} bytes (limit is {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("Dataset must have at least 2 columns, found {found}")]
    TooFewColumns { found: usize },

    #[error("Dataset must have at least 1 data row, found {found}")]
    TooFewRows { found: usize },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File could not be parsed: {0}")]
    CorruptFile(String),
}

impl ValidationError {
    /// The fieldless kind of this error.
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::TooLarge { .. } => ValidationErrorKind::TooLarge,
            Self::TooFewColumns { .. } => ValidationErrorKind::TooFewColumns,
            Self::TooFewRows { .. } => ValidationErrorKind::TooFewRows,
            Self::UnsupportedFormat(_) => ValidationErrorKind::UnsupportedFormat,
            Self::CorruptFile(_) => ValidationErrorKind::CorruptFile,
        }
    }
}

/// Non-fatal condition recorded while cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleaningWarning {
    /// Column removed because every value was missing.
    ColumnDropped { column: String, reason: String },
    /// Text or temporal column whose missing ratio exceeds the threshold.
    HighNullRatio { column: String, ratio: f64 },
}

impl CleaningWarning {
    pub fn column(&self) -> &str {
        match self {
            Self::ColumnDropped { column, .. } | Self::HighNullRatio { column, .. } => column,
        }
    }
}

impl std::fmt::Display for CleaningWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnDropped { column, reason } => {
                write!(f, "Column '{}' dropped: {}", column, reason)
            }
            Self::HighNullRatio { column, ratio } => write!(
                f,
                "Column '{}' has {:.1}% missing values",
                column,
                ratio * 100.0
            ),
        }
    }
}

/// Chart rendering failure. Always handled locally by the report builders.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Not enough distinct values to chart ({distinct} found, 2 required)")]
    InsufficientData { distinct: usize },

    #[error("Chart rendering failed: {0}")]
    RenderFailure(String),
}

/// The main error type for the reporting pipeline.
#[derive(Error, Debug)]
pub enum ReportingError {
    /// Pipeline was cancelled by the caller.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Input rejected before processing.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal inconsistency between pipeline stages.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A pipeline stage was invoked before the stage it depends on.
    #[error("Stage '{stage}' requires '{requires}' to run first")]
    StageOutOfOrder {
        stage: &'static str,
        requires: &'static str,
    },

    /// Spreadsheet serialization failed.
    #[error("Workbook generation failed: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// Document serialization failed.
    #[error("Document generation failed: {0}")]
    Document(String),

    /// Artifact delivery failed.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Internal error (e.g., thread join failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReportingError>,
    },
}

impl ReportingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for callers that branch on error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Validation(e) => match e.kind() {
                ValidationErrorKind::TooLarge => "TOO_LARGE",
                ValidationErrorKind::TooFewColumns => "TOO_FEW_COLUMNS",
                ValidationErrorKind::TooFewRows => "TOO_FEW_ROWS",
                ValidationErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
                ValidationErrorKind::CorruptFile => "CORRUPT_FILE",
            },
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ContractViolation(_) => "CONTRACT_VIOLATION",
            Self::StageOutOfOrder { .. } => "STAGE_OUT_OF_ORDER",
            Self::Workbook(_) => "WORKBOOK_ERROR",
            Self::Document(_) => "DOCUMENT_ERROR",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The validation failure behind this error, if any.
    pub fn validation_kind(&self) -> Option<ValidationErrorKind> {
        match self {
            Self::Validation(e) => Some(e.kind()),
            Self::WithContext { source, .. } => source.validation_kind(),
            _ => None,
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this error is recoverable (i.e., the caller can fix the
    /// input or configuration and retry).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Cancelled
            | Self::Validation(_)
            | Self::InvalidConfig(_)
            | Self::StageOutOfOrder { .. } => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as `{code, message}`.
impl Serialize for ReportingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for reporting operations.
pub type Result<T> = std::result::Result<T, ReportingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ReportingError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            ReportingError::ColumnNotFound("test".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            ReportingError::from(ValidationError::TooFewRows { found: 0 }).error_code(),
            "TOO_FEW_ROWS"
        );
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let inner = ValidationError::TooFewColumns { found: 1 };
        let outer = ReportingError::from(inner.clone());
        assert_eq!(outer.to_string(), inner.to_string());
        assert_eq!(
            outer.validation_kind(),
            Some(ValidationErrorKind::TooFewColumns)
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(ReportingError::Cancelled.is_recoverable());
        assert!(ReportingError::from(ValidationError::TooLarge { size: 2, limit: 1 }).is_recoverable());
        assert!(!ReportingError::ContractViolation("mismatch".to_string()).is_recoverable());
        assert!(!ReportingError::Internal("join".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_serialization() {
        let error = ReportingError::ColumnNotFound("Revenue".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Revenue"));
    }

    #[test]
    fn test_with_context() {
        let error = ReportingError::from(ValidationError::CorruptFile("bad quote".to_string()))
            .with_context("While reading sales.csv");
        assert!(error.to_string().contains("While reading sales.csv"));
        assert_eq!(error.error_code(), "CORRUPT_FILE");
        assert_eq!(error.validation_kind(), Some(ValidationErrorKind::CorruptFile));
    }

    #[test]
    fn test_warning_display() {
        let warning = CleaningWarning::HighNullRatio {
            column: "Notes".to_string(),
            ratio: 0.75,
        };
        assert_eq!(warning.to_string(), "Column 'Notes' has 75.0% missing values");
        assert_eq!(warning.column(), "Notes");
    }
}

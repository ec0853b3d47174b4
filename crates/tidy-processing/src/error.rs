//! Error types for the cleaning pipeline.
//!
//! Every failure the pipeline, the dataset loaders and the chart preparation
//! can hit is a variant of [`CleaningError`]. Errors serialize to a
//! `{code, message}` pair so the presentation layer can show them as-is.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// A referenced column is absent from the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A column could not be cast to the requested type.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeCastFailure {
        column: String,
        target_type: String,
        reason: String,
    },

    /// A numeric operation was requested on a non-numeric column.
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    /// Two columns cannot be combined elementwise.
    #[error("Cannot combine columns '{left}' and '{right}': {reason}")]
    IncompatibleColumns {
        left: String,
        right: String,
        reason: String,
    },

    /// A value could not be parsed as a datetime.
    #[error("Failed to parse '{value}' in column '{column}' as a datetime")]
    DatetimeParse { column: String, value: String },

    /// The chart collaborator could not render the requested plot.
    #[error("Failed to render chart: {0}")]
    RenderFailure(String),

    /// Invalid operation spec provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

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
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for frontend handling and diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TypeCastFailure { .. } => "TYPE_CAST_FAILURE",
            Self::NotNumeric(_) => "NOT_NUMERIC",
            Self::IncompatibleColumns { .. } => "INCOMPATIBLE_COLUMNS",
            Self::DatetimeParse { .. } => "DATETIME_PARSE",
            Self::RenderFailure(_) => "RENDER_FAILURE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The innermost error, with every context layer removed.
    pub fn root(&self) -> &CleaningError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error names a missing column.
    pub fn is_column_not_found(&self) -> bool {
        matches!(self.root(), Self::ColumnNotFound(_))
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

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
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            CleaningError::ColumnNotFound("test".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            CleaningError::RenderFailure("boom".to_string()).error_code(),
            "RENDER_FAILURE"
        );
    }

    #[test]
    fn test_type_cast_failure_message_names_column() {
        let error = CleaningError::TypeCastFailure {
            column: "age".to_string(),
            target_type: "int".to_string(),
            reason: "column not found".to_string(),
        };
        assert!(error.to_string().contains("'age'"));
        assert_eq!(error.error_code(), "TYPE_CAST_FAILURE");
    }

    #[test]
    fn test_error_serialization() {
        let error = CleaningError::ColumnNotFound("Age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Age"));
    }

    #[test]
    fn test_with_context() {
        let error = CleaningError::ColumnNotFound("test".to_string()).with_context("Drop columns");
        assert!(error.to_string().contains("Drop columns"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
        assert!(error.is_column_not_found());
    }
}

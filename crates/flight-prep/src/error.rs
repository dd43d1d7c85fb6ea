//! Custom error types for the flight preparation pipeline.
//!
//! Every stage returns [`PipelineError`]. All variants are fatal for the run:
//! the pipeline is a one-shot batch computation, so nothing is retried and no
//! partial output is kept. Non-fatal conditions (such as duplicate join keys)
//! are reported as [`crate::types::PipelineWarning`] instead.
//!
//! Errors are serializable so they can be embedded in the JSON report.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the preparation pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The drop phase would have removed every record of a table.
    #[error("All {rows_before} rows of '{table}' would be dropped")]
    DataLoss { table: String, rows_before: usize },

    /// A rule or feature spec references a column the table does not have.
    #[error("Column '{column}' not found in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// A value could not be parsed as the declared type, even after
    /// decimal-comma normalization.
    #[error("Cannot parse '{value}' in column '{column}' (row {row}) as {target}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        target: String,
    },

    /// A parsed value is outside the domain a transform accepts.
    #[error("Invalid value {value} in column '{column}' (row {row}): {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A stage broke one of its own post-conditions.
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
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for [`PipelineError::UnknownColumn`].
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        PipelineError::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DataLoss { .. } => "DATA_LOSS",
            Self::UnknownColumn { .. } => "UNKNOWN_COLUMN",
            Self::TypeCoercion { .. } => "TYPE_COERCION",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Strip any context wrappers and return the underlying error.
    pub fn root(&self) -> &PipelineError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the error comes from the input data rather than from
    /// configuration or the environment.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self.root(),
            Self::DataLoss { .. }
                | Self::TypeCoercion { .. }
                | Self::InvalidValue { .. }
                | Self::NoValidValues(_)
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

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
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = PipelineError::DataLoss {
            table: "flights".to_string(),
            rows_before: 3,
        };
        assert_eq!(err.error_code(), "DATA_LOSS");
        assert_eq!(
            PipelineError::unknown_column("weather", "temp").error_code(),
            "UNKNOWN_COLUMN"
        );
    }

    #[test]
    fn test_type_coercion_message_names_value_and_row() {
        let err = PipelineError::TypeCoercion {
            column: "pressure".to_string(),
            row: 7,
            value: "1.012,5".to_string(),
            target: "real".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1.012,5"));
        assert!(msg.contains("row 7"));
        assert!(msg.contains("pressure"));
    }

    #[test]
    fn test_is_data_error() {
        assert!(PipelineError::NoValidValues("x".to_string()).is_data_error());
        assert!(!PipelineError::InvalidConfig("bad".to_string()).is_data_error());
        let wrapped = PipelineError::NoValidValues("x".to_string()).with_context("Cleaning");
        assert!(wrapped.is_data_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::unknown_column("planes", "seats");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNKNOWN_COLUMN"));
        assert!(json.contains("seats"));
    }

    #[test]
    fn test_with_context() {
        let error = PipelineError::unknown_column("flights", "dep_time")
            .with_context("While cleaning flights");
        assert!(error.to_string().contains("While cleaning flights"));
        assert_eq!(error.error_code(), "UNKNOWN_COLUMN");
    }
}

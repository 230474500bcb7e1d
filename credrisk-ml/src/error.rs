//! Error types for the credrisk-ml crate.
//!
//! [`PipelineError`] is tagged by kind so callers can tell an unreadable
//! file from a schema mismatch without inspecting messages. Orchestrators
//! wrap it in a [`StageError`] that records where the run stopped.

use crate::ingestion::IngestionStep;
use crate::validation::ValidationState;
use credrisk_core::ConfigError;
use std::fmt;
use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Every failure a pipeline operation can produce.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error while {operation} '{}': {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed document '{}': {message}", path.display())]
    Document { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Drift test error: {0}")]
    Drift(String),

    #[error("Record source error: {0}")]
    Source(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// Adapter for `map_err` on filesystem calls.
    pub fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            operation,
            path,
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>) -> impl FnOnce(csv::Error) -> Self {
        let path = path.into();
        move |source| Self::Csv { path, source }
    }

    pub fn document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn drift(msg: impl Into<String>) -> Self {
        Self::Drift(msg.into())
    }

    pub fn record_source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}

/// The step a run was executing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion(IngestionStep),
    Validation(ValidationState),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingestion(step) => write!(f, "ingestion/{step}"),
            Stage::Validation(state) => write!(f, "validation/{state}"),
        }
    }
}

impl From<IngestionStep> for Stage {
    fn from(step: IngestionStep) -> Self {
        Stage::Ingestion(step)
    }
}

impl From<ValidationState> for Stage {
    fn from(state: ValidationState) -> Self {
        Stage::Validation(state)
    }
}

/// A fatal pipeline error with the stage and call site that raised it.
#[derive(Debug, Error)]
#[error("{stage} failed at {location}: {source}")]
pub struct StageError {
    pub stage: Stage,
    pub location: &'static Location<'static>,
    #[source]
    pub source: PipelineError,
}

impl StageError {
    #[track_caller]
    pub fn new(stage: impl Into<Stage>, source: PipelineError) -> Self {
        Self {
            stage: stage.into(),
            location: Location::caller(),
            source,
        }
    }

    /// The underlying error, for matching on its kind.
    pub fn kind(&self) -> &PipelineError {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_records_call_site() {
        let err = StageError::new(
            ValidationState::SchemaCheck,
            PipelineError::schema("train table has 4 columns, schema declares 5"),
        );
        assert_eq!(err.location.file(), file!());
        assert!(matches!(err.kind(), PipelineError::Schema(_)));
        let msg = err.to_string();
        assert!(msg.starts_with("validation/schema_check failed at "), "{msg}");
        assert!(msg.contains("schema declares 5"));
    }

    #[test]
    fn test_io_adapter() {
        let err = std::fs::read("/nonexistent/train.csv")
            .map_err(PipelineError::io("reading", "/nonexistent/train.csv"))
            .unwrap_err();
        match err {
            PipelineError::Io {
                operation, path, ..
            } => {
                assert_eq!(operation, "reading");
                assert_eq!(path, PathBuf::from("/nonexistent/train.csv"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//! # credrisk-ml: data ingestion and validation for credit-risk datasets
//!
//! Pulls raw records from a [`RecordSource`](data::RecordSource), splits
//! them into train/test CSVs, then validates the pair:
//!
//! - schema conformance (column count and per-column types),
//! - integrity (no missing cells),
//! - distribution drift per column (two-sample Kolmogorov–Smirnov),
//! - class balance of the target column (advisory).
//!
//! [`TrainingPipeline`] runs both stages with paths from
//! [`ArtifactLayout`]; [`DataIngestion`] and [`DataValidation`] can also be
//! driven on their own.

pub mod artifact;
pub mod data;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod validate;
pub mod validation;

pub use artifact::{ArtifactLayout, DataIngestionArtifact, DataValidationArtifact};
pub use error::{PipelineError, Result, Stage, StageError};
pub use ingestion::{DataIngestion, DataIngestionConfig, IngestionStep, push_csv};
pub use pipeline::{PipelineArtifacts, TrainingPipeline};
pub use validation::{DataValidation, DataValidationConfig, ValidationState};

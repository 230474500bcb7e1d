//! # credrisk-core
//!
//! Shared foundation for the credit-risk data pipeline: layered
//! configuration and atomic file persistence.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::{
    ConfigOverrides, IngestionConfig, PipelineConfig, RecordSourceConfig, ValidationConfig,
    load_config,
};
pub use error::{ConfigError, Result};

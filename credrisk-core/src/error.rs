//! Error types for configuration loading.

/// Result alias used by `credrisk-core`.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or checking the pipeline configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

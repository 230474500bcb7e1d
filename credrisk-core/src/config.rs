//! Configuration system for the pipeline.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace `credrisk.toml` -> environment -> CLI overrides.

use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the workspace-level configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = "credrisk.toml";

/// Prefix for environment overrides (`CREDRISK_VALIDATION__DRIFT_THRESHOLD`, ...).
pub const ENV_PREFIX: &str = "CREDRISK_";

/// Top-level configuration for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory for every artifact the pipeline writes.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// Write each run under a `<artifact_dir>/<timestamp>/` subdirectory.
    #[serde(default = "default_true")]
    pub timestamped_artifacts: bool,
    /// Where raw records come from.
    #[serde(default)]
    pub source: RecordSourceConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            timestamped_artifacts: true,
            source: RecordSourceConfig::default(),
            ingestion: IngestionConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject values that would make the run meaningless.
    pub fn check(&self) -> Result<()> {
        let ratio = self.ingestion.train_test_split_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "ingestion.train_test_split_ratio".into(),
                message: format!("must be strictly between 0 and 1, got {ratio}"),
            });
        }
        let threshold = self.validation.drift_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "validation.drift_threshold".into(),
                message: format!("must be strictly between 0 and 1, got {threshold}"),
            });
        }
        if self.validation.target_column.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "validation.target_column".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("Artifacts")
}

fn default_true() -> bool {
    true
}

/// Record source selection, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordSourceConfig {
    /// Rows of a local CSV file.
    Csv { path: PathBuf },
    /// One JSON object per line.
    Jsonl { path: PathBuf },
    /// A collection in a remote document store reached over its JSON HTTP API.
    DataApi {
        endpoint: String,
        keyspace: String,
        collection: String,
        /// Application token; usually supplied as `CREDRISK_SOURCE__TOKEN`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

impl Default for RecordSourceConfig {
    fn default() -> Self {
        Self::Csv {
            path: PathBuf::from("credit_data/SouthGermanCreditData.csv"),
        }
    }
}

/// Ingestion step configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_feature_store_file")]
    pub feature_store_file_name: String,
    #[serde(default = "default_train_file")]
    pub train_file_name: String,
    #[serde(default = "default_test_file")]
    pub test_file_name: String,
    /// Share of rows that go to the test split.
    #[serde(default = "default_split_ratio")]
    pub train_test_split_ratio: f64,
    /// Seed for the row shuffle, so that splits are reproducible.
    #[serde(default = "default_split_seed")]
    pub split_seed: u64,
    /// Columns removed from fetched records before anything is written.
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
    /// String values in fetched records that stand for a missing value.
    #[serde(default = "default_missing_markers")]
    pub missing_markers: Vec<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            feature_store_file_name: default_feature_store_file(),
            train_file_name: default_train_file(),
            test_file_name: default_test_file(),
            train_test_split_ratio: default_split_ratio(),
            split_seed: default_split_seed(),
            drop_columns: default_drop_columns(),
            missing_markers: default_missing_markers(),
        }
    }
}

fn default_feature_store_file() -> String {
    "SouthGermanCreditData.csv".to_string()
}

fn default_train_file() -> String {
    "train.csv".to_string()
}

fn default_test_file() -> String {
    "test.csv".to_string()
}

fn default_split_ratio() -> f64 {
    0.2
}

fn default_split_seed() -> u64 {
    42
}

fn default_drop_columns() -> Vec<String> {
    vec!["_id".to_string()]
}

fn default_missing_markers() -> Vec<String> {
    vec!["na".to_string()]
}

/// Validation step configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Declarative schema document (YAML).
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,
    /// Column inspected for class balance.
    #[serde(default = "default_target_column")]
    pub target_column: String,
    /// p-value below which a column is flagged as drifted.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
    #[serde(default = "default_report_file")]
    pub report_file_name: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            schema_file: default_schema_file(),
            target_column: default_target_column(),
            drift_threshold: default_drift_threshold(),
            report_file_name: default_report_file(),
        }
    }
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("data_schema").join("schema.yaml")
}

fn default_target_column() -> String {
    "credit_risk".to_string()
}

fn default_drift_threshold() -> f64 {
    0.05
}

fn default_report_file() -> String {
    "report.yaml".to_string()
}

/// Values supplied on the command line. Only the fields that are set win.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamped_artifacts: Option<bool>,
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `CREDRISK_`)
/// 3. Workspace config (`credrisk.toml`), or `config_file` when given
/// 4. User config (`~/.config/credrisk/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<PipelineConfig> {
    let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "credrisk", "credrisk") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    match (config_file, workspace) {
        (Some(file), _) => {
            // An explicitly named file must exist.
            if !file.exists() {
                return Err(ConfigError::InvalidValue {
                    field: "config".into(),
                    message: format!("{} does not exist", file.display()),
                });
            }
            figment = figment.merge(Toml::file(file));
        }
        (None, Some(ws)) => {
            let ws_config = ws.join(WORKSPACE_CONFIG_FILE);
            if ws_config.exists() {
                figment = figment.merge(Toml::file(&ws_config));
            }
        }
        (None, None) => {}
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: PipelineConfig = figment.extract().map_err(Box::new)?;
    config.check()?;
    tracing::debug!(artifact_dir = %config.artifact_dir.display(), "Loaded pipeline configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.artifact_dir, PathBuf::from("Artifacts"));
        assert_eq!(config.ingestion.train_test_split_ratio, 0.2);
        assert_eq!(config.ingestion.drop_columns, vec!["_id".to_string()]);
        assert_eq!(config.validation.target_column, "credit_risk");
        assert_eq!(config.validation.drift_threshold, 0.05);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = PipelineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: PipelineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_load_config_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            r#"
artifact_dir = "out"

[source]
type = "data_api"
endpoint = "https://db.example.com"
keyspace = "bank_credit_risk"
collection = "german_credit_risk"

[validation]
drift_threshold = 0.01
"#,
        )
        .unwrap();

        let config = load_config(None, Some(&path), None).unwrap();
        assert_eq!(config.artifact_dir, PathBuf::from("out"));
        assert_eq!(config.validation.drift_threshold, 0.01);
        assert_eq!(config.validation.target_column, "credit_risk");
        match config.source {
            RecordSourceConfig::DataApi {
                collection, token, ..
            } => {
                assert_eq!(collection, "german_credit_risk");
                assert!(token.is_none());
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let err = load_config(None, Some(Path::new("/nonexistent/credrisk.toml")), None);
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(WORKSPACE_CONFIG_FILE),
            "artifact_dir = \"from_file\"\n",
        )
        .unwrap();
        let overrides = ConfigOverrides {
            artifact_dir: Some(PathBuf::from("from_cli")),
            timestamped_artifacts: Some(false),
        };
        let config = load_config(Some(dir.path()), None, Some(&overrides)).unwrap();
        assert_eq!(config.artifact_dir, PathBuf::from("from_cli"));
        assert!(!config.timestamped_artifacts);
    }

    #[test]
    fn test_rejects_out_of_range_split_ratio() {
        let mut config = PipelineConfig::default();
        config.ingestion.train_test_split_ratio = 1.0;
        assert!(matches!(
            config.check(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "ingestion.train_test_split_ratio"
        ));
    }

    #[test]
    fn test_rejects_out_of_range_drift_threshold() {
        let mut config = PipelineConfig::default();
        config.validation.drift_threshold = 0.0;
        assert!(config.check().is_err());
    }
}

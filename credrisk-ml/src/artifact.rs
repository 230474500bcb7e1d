//! Artifact layout on disk and the result objects each stage hands back.

use chrono::{DateTime, Utc};
use credrisk_core::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DATA_INGESTION_DIR: &str = "data_ingestion";
const FEATURE_STORE_DIR: &str = "feature_store";
const INGESTED_DIR: &str = "ingested";
const DATA_VALIDATION_DIR: &str = "data_validation";
const VALID_DIR: &str = "validated";
const DRIFT_REPORT_DIR: &str = "drift_report";

/// Format of the per-run artifact directory name.
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Resolved artifact paths for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub run_dir: PathBuf,
    pub feature_store_file: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub valid_train_file: PathBuf,
    pub valid_test_file: PathBuf,
    pub drift_report_file: PathBuf,
}

impl ArtifactLayout {
    /// Lay out a run started at `started_at`.
    pub fn new(config: &PipelineConfig, started_at: DateTime<Utc>) -> Self {
        let run_dir = if config.timestamped_artifacts {
            config
                .artifact_dir
                .join(started_at.format(TIMESTAMP_FORMAT).to_string())
        } else {
            config.artifact_dir.clone()
        };
        Self::under(&run_dir, config)
    }

    fn under(run_dir: &Path, config: &PipelineConfig) -> Self {
        let ingestion = run_dir.join(DATA_INGESTION_DIR);
        let validation = run_dir.join(DATA_VALIDATION_DIR);
        let ing = &config.ingestion;
        Self {
            run_dir: run_dir.to_path_buf(),
            feature_store_file: ingestion
                .join(FEATURE_STORE_DIR)
                .join(&ing.feature_store_file_name),
            train_file: ingestion.join(INGESTED_DIR).join(&ing.train_file_name),
            test_file: ingestion.join(INGESTED_DIR).join(&ing.test_file_name),
            valid_train_file: validation.join(VALID_DIR).join(&ing.train_file_name),
            valid_test_file: validation.join(VALID_DIR).join(&ing.test_file_name),
            drift_report_file: validation
                .join(DRIFT_REPORT_DIR)
                .join(&config.validation.report_file_name),
        }
    }
}

/// Output of the ingestion step: where the split datasets were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub feature_store_file_path: PathBuf,
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
}

/// Output of the validation step.
///
/// `validation_status` reflects the drift outcome only; schema and integrity
/// failures abort the run instead. The `invalid_*` paths are never populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    pub validation_status: bool,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub invalid_train_file_path: Option<PathBuf>,
    pub invalid_test_file_path: Option<PathBuf>,
    pub drift_report_file_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_timestamped_layout() {
        let config = PipelineConfig::default();
        let started = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        let layout = ArtifactLayout::new(&config, started);
        let run = PathBuf::from("Artifacts").join("03_07_2024_09_05_01");
        assert_eq!(layout.run_dir, run);
        assert_eq!(
            layout.feature_store_file,
            run.join("data_ingestion/feature_store/SouthGermanCreditData.csv")
        );
        assert_eq!(layout.test_file, run.join("data_ingestion/ingested/test.csv"));
        assert_eq!(
            layout.valid_train_file,
            run.join("data_validation/validated/train.csv")
        );
        assert_eq!(
            layout.drift_report_file,
            run.join("data_validation/drift_report/report.yaml")
        );
    }

    #[test]
    fn test_flat_layout() {
        let config = PipelineConfig {
            artifact_dir: PathBuf::from("out"),
            timestamped_artifacts: false,
            ..PipelineConfig::default()
        };
        let layout = ArtifactLayout::new(&config, Utc::now());
        assert_eq!(layout.run_dir, PathBuf::from("out"));
    }
}

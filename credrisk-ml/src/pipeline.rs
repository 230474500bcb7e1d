//! End-to-end run: ingestion followed by validation.

use crate::artifact::{ArtifactLayout, DataIngestionArtifact, DataValidationArtifact};
use crate::data::schema::YamlSchemaFile;
use crate::data::source;
use crate::data::store::CsvTableStore;
use crate::error::{PipelineError, StageError};
use crate::ingestion::{DataIngestion, DataIngestionConfig, IngestionStep};
use crate::validation::{DataValidation, DataValidationConfig};
use chrono::Utc;
use credrisk_core::PipelineConfig;
use serde::Serialize;

/// Artifacts of a full run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineArtifacts {
    pub ingestion: DataIngestionArtifact,
    pub validation: DataValidationArtifact,
}

/// Wires the configured stages together for one run.
pub struct TrainingPipeline {
    config: PipelineConfig,
    layout: ArtifactLayout,
}

impl TrainingPipeline {
    /// Fails when the configuration does not pass [`PipelineConfig::check`].
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.check()?;
        let layout = ArtifactLayout::new(&config, Utc::now());
        Ok(Self { config, layout })
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn start_data_ingestion(&self) -> Result<DataIngestionArtifact, StageError> {
        let source = source::from_config(&self.config.source)
            .map_err(|e| StageError::new(IngestionStep::Fetch, e))?;
        let ingestion = DataIngestion::new(
            DataIngestionConfig::new(&self.layout, &self.config.ingestion),
            source,
            Box::new(CsvTableStore::new()),
        );
        let artifact = ingestion.initiate()?;
        tracing::info!(train = %artifact.train_file_path.display(), "Data ingestion completed");
        Ok(artifact)
    }

    pub fn start_data_validation(
        &self,
        ingestion: DataIngestionArtifact,
    ) -> Result<DataValidationArtifact, StageError> {
        let mut validation = DataValidation::new(
            ingestion,
            DataValidationConfig::new(&self.layout, &self.config.validation),
            Box::new(YamlSchemaFile::new(&self.config.validation.schema_file)),
            Box::new(CsvTableStore::new()),
        );
        let artifact = validation.initiate()?;
        tracing::info!(
            validation_status = artifact.validation_status,
            "Data validation completed"
        );
        Ok(artifact)
    }

    pub fn run(&self) -> Result<PipelineArtifacts, StageError> {
        let ingestion = self.start_data_ingestion()?;
        let validation = self.start_data_validation(ingestion.clone())?;
        Ok(PipelineArtifacts {
            ingestion,
            validation,
        })
    }
}

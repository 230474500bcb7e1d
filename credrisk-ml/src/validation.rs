//! Validation orchestrator.
//!
//! Runs the validators over the ingested train/test datasets as a small
//! state machine:
//!
//! `Load → SchemaCheck → IntegrityCheck → DriftCheck → BalanceCheck → Persist → Done`
//!
//! Any error moves the run to `Failed` and is returned as a [`StageError`].
//! Drift is a result, not a failure: it only clears `validation_status`.

use crate::artifact::{ArtifactLayout, DataIngestionArtifact, DataValidationArtifact};
use crate::data::schema::{Schema, SchemaProvider};
use crate::data::store::TableStore;
use crate::data::table::Table;
use crate::error::{PipelineError, StageError};
use crate::validate::{
    DriftDetector, inspect_balance, validate_column_count, validate_column_types,
    validate_no_missing,
};
use credrisk_core::ValidationConfig;
use std::fmt;
use std::path::{Path, PathBuf};

/// States of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    Load,
    SchemaCheck,
    IntegrityCheck,
    DriftCheck,
    BalanceCheck,
    Persist,
    Done,
    Failed,
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationState::Load => "load",
            ValidationState::SchemaCheck => "schema_check",
            ValidationState::IntegrityCheck => "integrity_check",
            ValidationState::DriftCheck => "drift_check",
            ValidationState::BalanceCheck => "balance_check",
            ValidationState::Persist => "persist",
            ValidationState::Done => "done",
            ValidationState::Failed => "failed",
        })
    }
}

/// Where validated outputs go and how drift is judged.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub target_column: String,
    pub drift_threshold: f64,
}

impl DataValidationConfig {
    pub fn new(layout: &ArtifactLayout, validation: &ValidationConfig) -> Self {
        Self {
            valid_train_file_path: layout.valid_train_file.clone(),
            valid_test_file_path: layout.valid_test_file.clone(),
            drift_report_file_path: layout.drift_report_file.clone(),
            target_column: validation.target_column.clone(),
            drift_threshold: validation.drift_threshold,
        }
    }
}

/// Validates one pair of ingested datasets.
pub struct DataValidation {
    ingestion: DataIngestionArtifact,
    config: DataValidationConfig,
    schema_provider: Box<dyn SchemaProvider>,
    store: Box<dyn TableStore>,
    state: ValidationState,
}

impl DataValidation {
    pub fn new(
        ingestion: DataIngestionArtifact,
        config: DataValidationConfig,
        schema_provider: Box<dyn SchemaProvider>,
        store: Box<dyn TableStore>,
    ) -> Self {
        Self {
            ingestion,
            config,
            schema_provider,
            store,
            state: ValidationState::Load,
        }
    }

    /// Current state; `Done` or `Failed` once [`initiate`](Self::initiate) returns.
    pub fn state(&self) -> ValidationState {
        self.state
    }

    /// Run every check and persist the validated datasets.
    pub fn initiate(&mut self) -> Result<DataValidationArtifact, StageError> {
        match self.run() {
            Ok(artifact) => {
                self.transition(ValidationState::Done);
                Ok(artifact)
            }
            Err(err) => {
                tracing::error!(
                    stage = %err.stage,
                    location = %err.location,
                    "Data validation failed: {}",
                    err.source
                );
                self.transition(ValidationState::Failed);
                Err(err)
            }
        }
    }

    fn transition(&mut self, next: ValidationState) {
        tracing::debug!(from = %self.state, to = %next, "Validation state change");
        self.state = next;
    }

    fn run(&mut self) -> Result<DataValidationArtifact, StageError> {
        use ValidationState::*;

        self.transition(Load);
        let schema = self
            .schema_provider
            .load_schema()
            .map_err(|e| StageError::new(Load, e))?;
        let train = self.read(&self.ingestion.train_file_path)?;
        let test = self.read(&self.ingestion.test_file_path)?;

        self.transition(SchemaCheck);
        let target = schema
            .target_column()
            .unwrap_or(self.config.target_column.as_str())
            .to_string();
        check_schema(&train, &test, &schema)
            .and_then(|()| check_target(&train, &target))
            .map_err(|e| StageError::new(SchemaCheck, e))?;

        self.transition(IntegrityCheck);
        check_integrity(&train, &test).map_err(|e| StageError::new(IntegrityCheck, e))?;

        self.transition(DriftCheck);
        let detector = DriftDetector::new(&self.config.drift_report_file_path)
            .with_threshold(self.config.drift_threshold);
        let (drift_status, _report) = detector
            .detect(&train, &test)
            .map_err(|e| StageError::new(DriftCheck, e))?;

        self.transition(BalanceCheck);
        inspect_balance(&train, &target, schema.imbalance_threshold())
            .map_err(|e| StageError::new(BalanceCheck, e))?;

        self.transition(Persist);
        self.store
            .write(&train, &self.config.valid_train_file_path)
            .map_err(|e| StageError::new(Persist, e))?;
        self.store
            .write(&test, &self.config.valid_test_file_path)
            .map_err(|e| StageError::new(Persist, e))?;

        Ok(DataValidationArtifact {
            validation_status: drift_status,
            valid_train_file_path: self.config.valid_train_file_path.clone(),
            valid_test_file_path: self.config.valid_test_file_path.clone(),
            invalid_train_file_path: None,
            invalid_test_file_path: None,
            drift_report_file_path: self.config.drift_report_file_path.clone(),
        })
    }

    fn read(&self, path: &Path) -> Result<Table, StageError> {
        self.store
            .read(path)
            .map_err(|e| StageError::new(ValidationState::Load, e))
    }
}

/// Column count first (train, then test), then column types.
fn check_schema(train: &Table, test: &Table, schema: &Schema) -> Result<(), PipelineError> {
    if !validate_column_count(train, schema) {
        return Err(PipelineError::schema(
            "Train dataset does not have the required columns",
        ));
    }
    if !validate_column_count(test, schema) {
        return Err(PipelineError::schema(
            "Test dataset does not have the required columns",
        ));
    }
    if !validate_column_types(train, schema) {
        return Err(PipelineError::schema("Train dataset has incorrect data types"));
    }
    if !validate_column_types(test, schema) {
        return Err(PipelineError::schema("Test dataset has incorrect data types"));
    }
    Ok(())
}

/// The balance check needs the target column; it must exist before
/// anything is written.
fn check_target(train: &Table, target: &str) -> Result<(), PipelineError> {
    if train.column(target).is_none() {
        return Err(PipelineError::schema(format!(
            "target column '{target}' is not in the train dataset"
        )));
    }
    Ok(())
}

fn check_integrity(train: &Table, test: &Table) -> Result<(), PipelineError> {
    if !validate_no_missing(train) {
        return Err(PipelineError::integrity("Train dataset contains missing values"));
    }
    if !validate_no_missing(test) {
        return Err(PipelineError::integrity("Test dataset contains missing values"));
    }
    Ok(())
}

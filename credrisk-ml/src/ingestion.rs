//! Ingestion: pull records from a source, export the feature store and
//! split it into train/test datasets.

use crate::artifact::{ArtifactLayout, DataIngestionArtifact};
use crate::data::source::{DataApiCollection, RecordSource};
use crate::data::store::{CsvTableStore, TableStore};
use crate::data::table::{Column, ColumnData, Table};
use crate::error::{PipelineError, Result, StageError};
use credrisk_core::IngestionConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fmt;
use std::path::{Path, PathBuf};

/// Column added by [`push_csv`] when the file has no identifier.
pub const ID_COLUMN: &str = "id";

/// Steps of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStep {
    Fetch,
    ExportFeatureStore,
    Split,
}

impl fmt::Display for IngestionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IngestionStep::Fetch => "fetch",
            IngestionStep::ExportFeatureStore => "export_feature_store",
            IngestionStep::Split => "split",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub feature_store_file_path: PathBuf,
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
    pub train_test_split_ratio: f64,
    pub split_seed: u64,
    pub drop_columns: Vec<String>,
    pub missing_markers: Vec<String>,
}

impl DataIngestionConfig {
    pub fn new(layout: &ArtifactLayout, ingestion: &IngestionConfig) -> Self {
        Self {
            feature_store_file_path: layout.feature_store_file.clone(),
            train_file_path: layout.train_file.clone(),
            test_file_path: layout.test_file.clone(),
            train_test_split_ratio: ingestion.train_test_split_ratio,
            split_seed: ingestion.split_seed,
            drop_columns: ingestion.drop_columns.clone(),
            missing_markers: ingestion.missing_markers.clone(),
        }
    }
}

pub struct DataIngestion {
    config: DataIngestionConfig,
    source: Box<dyn RecordSource>,
    store: Box<dyn TableStore>,
}

impl DataIngestion {
    pub fn new(
        config: DataIngestionConfig,
        source: Box<dyn RecordSource>,
        store: Box<dyn TableStore>,
    ) -> Self {
        Self {
            config,
            source,
            store,
        }
    }

    /// Fetch every record and build the feature table.
    pub fn export_collection(&self) -> Result<Table> {
        let records = self.source.fetch()?;
        if records.is_empty() {
            return Err(PipelineError::record_source(format!(
                "{} returned no records",
                self.source.describe()
            )));
        }
        Table::from_records(
            &records,
            &self.config.drop_columns,
            &self.config.missing_markers,
        )
    }

    pub fn export_feature_store(&self, table: &Table) -> Result<()> {
        self.store
            .write(table, &self.config.feature_store_file_path)
    }

    /// Shuffle-split `table` and write both halves.
    pub fn split_as_train_test(&self, table: &Table) -> Result<()> {
        let (train, test) = train_test_split(
            table,
            self.config.train_test_split_ratio,
            self.config.split_seed,
        )?;
        tracing::info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            "Performed train test split"
        );
        self.store.write(&train, &self.config.train_file_path)?;
        self.store.write(&test, &self.config.test_file_path)
    }

    pub fn initiate(&self) -> std::result::Result<DataIngestionArtifact, StageError> {
        tracing::info!(source = %self.source.describe(), "Starting data ingestion");
        let table = self
            .export_collection()
            .map_err(|e| StageError::new(IngestionStep::Fetch, e))?;
        self.export_feature_store(&table)
            .map_err(|e| StageError::new(IngestionStep::ExportFeatureStore, e))?;
        self.split_as_train_test(&table)
            .map_err(|e| StageError::new(IngestionStep::Split, e))?;

        Ok(DataIngestionArtifact {
            feature_store_file_path: self.config.feature_store_file_path.clone(),
            train_file_path: self.config.train_file_path.clone(),
            test_file_path: self.config.test_file_path.clone(),
        })
    }
}

/// Seeded random split; `ceil(test_ratio · n)` rows go to the test table.
///
/// Both halves keep the source column order. The same seed always yields
/// the same partition.
pub fn train_test_split(table: &Table, test_ratio: f64, seed: u64) -> Result<(Table, Table)> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(PipelineError::record_source(format!(
            "split ratio {test_ratio} is outside (0, 1)"
        )));
    }
    let n = table.n_rows();
    let n_test = (test_ratio * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::record_source(format!(
            "{n} rows are too few for a {test_ratio} test split"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((table.take_rows(train_idx), table.take_rows(test_idx)))
}

/// Load a CSV and insert its rows into `collection`.
///
/// Rows get an `id` column numbered from 1 when the file has none. Returns
/// the number of documents the collection accepted.
pub fn push_csv(collection: &DataApiCollection, path: &Path) -> Result<usize> {
    let mut table = CsvTableStore::new().read(path)?;
    with_row_ids(&mut table)?;
    let records = table.to_records();
    tracing::info!(path = %path.display(), records = records.len(), "Pushing records");
    collection.insert_many(&records)
}

fn with_row_ids(table: &mut Table) -> Result<()> {
    if table.column(ID_COLUMN).is_some() {
        return Ok(());
    }
    let ids = (1..=table.n_rows() as i64).map(Some).collect();
    table.insert_column(0, Column::new(ID_COLUMN, ColumnData::Integer(ids)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Record;
    use crate::error::Stage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct StaticSource(Vec<Record>);

    impl RecordSource for StaticSource {
        fn fetch(&self) -> Result<Vec<Record>> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "static".into()
        }
    }

    fn records(n: i64) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let value = json!({
                    "_id": format!("doc-{i}"),
                    "amount": 1000 + i,
                    "purpose": if i % 3 == 0 { "na" } else { "car" },
                    "credit_risk": i % 2,
                });
                value.as_object().cloned().unwrap()
            })
            .collect()
    }

    fn config(dir: &Path) -> DataIngestionConfig {
        DataIngestionConfig {
            feature_store_file_path: dir.join("feature_store").join("data.csv"),
            train_file_path: dir.join("ingested").join("train.csv"),
            test_file_path: dir.join("ingested").join("test.csv"),
            train_test_split_ratio: 0.2,
            split_seed: 42,
            drop_columns: vec!["_id".into()],
            missing_markers: vec!["na".into()],
        }
    }

    fn ingestion(dir: &Path, data: Vec<Record>) -> DataIngestion {
        DataIngestion::new(
            config(dir),
            Box::new(StaticSource(data)),
            Box::new(CsvTableStore::new()),
        )
    }

    #[test]
    fn test_step_display() {
        assert_eq!(IngestionStep::ExportFeatureStore.to_string(), "export_feature_store");
    }

    #[test]
    fn test_export_drops_id_and_marks_missing() {
        let dir = tempfile::tempdir().unwrap();
        let table = ingestion(dir.path(), records(6)).export_collection().unwrap();
        assert_eq!(table.column_names(), vec!["amount", "purpose", "credit_risk"]);
        assert_eq!(table.column("purpose").unwrap().data.missing_count(), 2);
    }

    #[test]
    fn test_initiate_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ingestion(dir.path(), records(10)).initiate().unwrap();
        let store = CsvTableStore::new();
        let train = store.read(&artifact.train_file_path).unwrap();
        let test = store.read(&artifact.test_file_path).unwrap();
        let full = store.read(&artifact.feature_store_file_path).unwrap();
        assert_eq!(full.n_rows(), 10);
        assert_eq!(test.n_rows(), 2);
        assert_eq!(train.n_rows(), 8);
        assert_eq!(train.column_names(), full.column_names());
    }

    #[test]
    fn test_empty_source_fails_in_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let err = ingestion(dir.path(), Vec::new()).initiate().unwrap_err();
        assert_eq!(err.stage, Stage::Ingestion(IngestionStep::Fetch));
        assert!(matches!(err.kind(), PipelineError::Source(_)));
        assert!(!dir.path().join("feature_store").exists());
    }

    #[test]
    fn test_split_is_seeded_and_partitions_rows() {
        let table = Table::from_records(&records(25), &[], &[]).unwrap();
        let (train_a, test_a) = train_test_split(&table, 0.2, 7).unwrap();
        let (train_b, test_b) = train_test_split(&table, 0.2, 7).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.n_rows(), 5);

        let mut ids: Vec<String> = train_a
            .column("_id")
            .unwrap()
            .data
            .labels()
            .into_iter()
            .chain(test_a.column("_id").unwrap().data.labels())
            .flatten()
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 25);
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let table = Table::from_records(&records(11), &[], &[]).unwrap();
        let (train, test) = train_test_split(&table, 0.2, 42).unwrap();
        assert_eq!(test.n_rows(), 3);
        assert_eq!(train.n_rows(), 8);
    }

    #[test]
    fn test_split_rejects_tiny_tables() {
        let table = Table::from_records(&records(1), &[], &[]).unwrap();
        assert!(train_test_split(&table, 0.2, 42).is_err());
    }

    #[test]
    fn test_row_ids_added_once() {
        let mut table = Table::from_records(&records(3), &["_id".into()], &[]).unwrap();
        with_row_ids(&mut table).unwrap();
        assert_eq!(table.column_names()[0], ID_COLUMN);
        assert_eq!(
            table.column(ID_COLUMN).unwrap().data,
            ColumnData::Integer(vec![Some(1), Some(2), Some(3)])
        );
        with_row_ids(&mut table).unwrap();
        assert_eq!(table.n_columns(), 4);
    }
}

//! Reading and writing tables as delimited files.

use crate::data::table::Table;
use crate::error::{PipelineError, Result};
use credrisk_core::persistence::atomic_write;
use std::path::Path;

/// Loads and persists tables.
pub trait TableStore {
    /// Load the table stored at `path`, inferring each column's type.
    fn read(&self, path: &Path) -> Result<Table>;

    /// Persist `table` at `path`, creating parent directories as needed.
    fn write(&self, table: &Table, path: &Path) -> Result<()>;
}

/// Comma-separated file store with a header row.
#[derive(Debug, Clone, Default)]
pub struct CsvTableStore;

impl CsvTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `table` to CSV bytes.
    pub fn to_bytes(&self, table: &Table) -> std::result::Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(table.column_names())?;
        for row in 0..table.n_rows() {
            writer.write_record(table.columns().iter().map(|c| c.data.cell_text(row)))?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

impl TableStore for CsvTableStore {
    fn read(&self, path: &Path) -> Result<Table> {
        let file = std::fs::File::open(path).map_err(PipelineError::io("opening dataset", path))?;
        let mut reader = csv::Reader::from_reader(file);

        let header: Vec<String> = reader
            .headers()
            .map_err(PipelineError::csv(path))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if header.is_empty() || header.iter().all(String::is_empty) {
            return Err(PipelineError::document(path, "missing header row"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(PipelineError::csv(path))?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let table = Table::from_text_rows(header, &rows)?;
        tracing::info!(
            path = %path.display(),
            rows = table.n_rows(),
            columns = table.n_columns(),
            "Read dataset"
        );
        Ok(table)
    }

    fn write(&self, table: &Table, path: &Path) -> Result<()> {
        let bytes = self.to_bytes(table).map_err(PipelineError::csv(path))?;
        atomic_write(path, &bytes).map_err(PipelineError::io("writing dataset", path))?;
        tracing::info!(
            path = %path.display(),
            rows = table.n_rows(),
            "Wrote dataset"
        );
        Ok(())
    }
}

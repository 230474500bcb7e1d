//! Record sources feeding the ingestion step.

use crate::data::store::{CsvTableStore, TableStore};
use crate::data::table::Record;
use crate::error::{PipelineError, Result};
use credrisk_core::RecordSourceConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;

/// Anything that yields the raw records of the dataset.
pub trait RecordSource {
    /// Fetch every record.
    fn fetch(&self) -> Result<Vec<Record>>;

    /// Short human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Build the record source named by the configuration.
pub fn from_config(config: &RecordSourceConfig) -> Result<Box<dyn RecordSource>> {
    Ok(match config {
        RecordSourceConfig::Csv { path } => Box::new(CsvRecordSource::new(path)),
        RecordSourceConfig::Jsonl { path } => Box::new(JsonlRecordSource::new(path)),
        RecordSourceConfig::DataApi {
            endpoint,
            keyspace,
            collection,
            token,
        } => Box::new(DataApiCollection::new(
            endpoint,
            keyspace,
            collection,
            token.as_deref(),
        )?),
    })
}

// ---------------------------------------------------------------------------
// CsvRecordSource
// ---------------------------------------------------------------------------

/// Rows of a local CSV file, typed by inference.
pub struct CsvRecordSource {
    pub path: PathBuf,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for CsvRecordSource {
    fn fetch(&self) -> Result<Vec<Record>> {
        Ok(CsvTableStore::new().read(&self.path)?.to_records())
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// JsonlRecordSource
// ---------------------------------------------------------------------------

/// JSON Lines file, one JSON object per line.
pub struct JsonlRecordSource {
    pub path: PathBuf,
}

impl JsonlRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for JsonlRecordSource {
    fn fetch(&self) -> Result<Vec<Record>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(PipelineError::io("reading records", &self.path))?;
        let mut records = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| {
                PipelineError::document(&self.path, format!("line {}: {e}", i + 1))
            })?;
            match value {
                Value::Object(map) => records.push(map),
                _ => {
                    return Err(PipelineError::document(
                        &self.path,
                        format!("line {}: expected a JSON object", i + 1),
                    ));
                }
            }
        }
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// DataApiCollection
// ---------------------------------------------------------------------------

/// Documents per `insertMany` request.
pub const INSERT_CHUNK_SIZE: usize = 20;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A collection in a remote document store, spoken to over its JSON API.
pub struct DataApiCollection {
    url: String,
    token: Option<String>,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    data: Option<FindData>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct FindData {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(default, rename = "nextPageState")]
    next_page_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl DataApiCollection {
    pub fn new(
        endpoint: &str,
        keyspace: &str,
        collection: &str,
        token: Option<&str>,
    ) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(PipelineError::record_source("data API endpoint is empty"));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            url: collection_url(endpoint, keyspace, collection),
            token: token.map(str::to_string),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, command: &Value) -> Result<ApiResponse> {
        let mut request = self.client.post(&self.url).json(command);
        if let Some(token) = &self.token {
            request = request.header("Token", token);
        }
        let response: ApiResponse = request.send()?.error_for_status()?.json()?;
        if let Some(first) = response.errors.first() {
            return Err(PipelineError::record_source(format!(
                "data API rejected the request: {}",
                first.message
            )));
        }
        Ok(response)
    }

    /// Insert records in chunks; returns how many were accepted.
    pub fn insert_many(&self, records: &[Record]) -> Result<usize> {
        let mut inserted = 0;
        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let response = self.post(&insert_many_command(chunk))?;
            inserted += inserted_count(&response);
        }
        tracing::info!(url = %self.url, inserted, "Inserted records into collection");
        Ok(inserted)
    }
}

impl RecordSource for DataApiCollection {
    fn fetch(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut page_state: Option<String> = None;
        loop {
            let response = self.post(&find_command(page_state.as_deref()))?;
            let data = response
                .data
                .ok_or_else(|| PipelineError::record_source("find response carries no data"))?;
            records.extend(into_records(data.documents)?);
            match data.next_page_state {
                Some(next) if !next.is_empty() => page_state = Some(next),
                _ => break,
            }
        }
        tracing::info!(url = %self.url, records = records.len(), "Fetched collection");
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("data_api:{}", self.url)
    }
}

fn collection_url(endpoint: &str, keyspace: &str, collection: &str) -> String {
    format!(
        "{}/api/json/v1/{keyspace}/{collection}",
        endpoint.trim_end_matches('/')
    )
}

fn find_command(page_state: Option<&str>) -> Value {
    match page_state {
        Some(state) => json!({"find": {"filter": {}, "options": {"pageState": state}}}),
        None => json!({"find": {"filter": {}}}),
    }
}

fn insert_many_command(records: &[Record]) -> Value {
    json!({"insertMany": {"documents": records, "options": {"ordered": false}}})
}

fn inserted_count(response: &ApiResponse) -> usize {
    response
        .status
        .as_ref()
        .and_then(|s| s.get("insertedIds"))
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

fn into_records(documents: Vec<Value>) -> Result<Vec<Record>> {
    documents
        .into_iter()
        .map(|doc| match doc {
            Value::Object(map) => Ok(map),
            other => Err(PipelineError::record_source(format!(
                "expected a document object, got {other}"
            ))),
        })
        .collect()
}

//! Declarative dataset schema and the provider that loads it.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default minimum share of any class in the target column.
pub const DEFAULT_IMBALANCE_THRESHOLD: f64 = 0.1;

/// Column data type.
///
/// Serialized with the dtype names used in schema documents (`int64`,
/// `float64`, `bool`, `object`); parsing also accepts common aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Categorical,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::Boolean => "bool",
            ColumnType::Categorical => "object",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int64" | "int" | "integer" => Ok(ColumnType::Integer),
            "float64" | "float" => Ok(ColumnType::Float),
            "bool" | "boolean" => Ok(ColumnType::Boolean),
            "object" | "category" | "categorical" | "str" | "string" => {
                Ok(ColumnType::Categorical)
            }
            other => Err(format!("unknown column type '{other}'")),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: ColumnType,
}

/// Ordered column declarations plus the class-balance threshold.
///
/// Immutable once loaded; validators borrow it for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
    imbalance_threshold: f64,
    target_column: Option<String>,
    numerical_columns: Vec<String>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        if columns.is_empty() {
            return Err(PipelineError::schema("schema declares no columns"));
        }
        for (i, spec) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == spec.name) {
                return Err(PipelineError::schema(format!(
                    "column '{}' is declared twice",
                    spec.name
                )));
            }
        }
        Ok(Self {
            columns,
            imbalance_threshold: DEFAULT_IMBALANCE_THRESHOLD,
            target_column: None,
            numerical_columns: Vec::new(),
        })
    }

    pub fn with_imbalance_threshold(mut self, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PipelineError::schema(format!(
                "imbalance_threshold must be within [0, 1], got {threshold}"
            )));
        }
        self.imbalance_threshold = threshold;
        Ok(self)
    }

    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Expected column count.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn dtype_of(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.dtype)
    }

    pub fn imbalance_threshold(&self) -> f64 {
        self.imbalance_threshold
    }

    /// Target column named by the document itself, if any.
    pub fn target_column(&self) -> Option<&str> {
        self.target_column.as_deref()
    }

    pub fn numerical_columns(&self) -> &[String] {
        &self.numerical_columns
    }

    /// Parse a YAML schema document.
    ///
    /// `columns` may be a mapping (`age: int64`) or a sequence of
    /// single-entry mappings (`- age: int64`); declaration order is kept.
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, String> {
        let doc: SchemaDocument = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

        let mut columns = Vec::new();
        match doc.columns {
            serde_yaml::Value::Mapping(map) => {
                for (name, dtype) in map {
                    columns.push(column_spec(&name, &dtype)?);
                }
            }
            serde_yaml::Value::Sequence(items) => {
                for item in items {
                    let serde_yaml::Value::Mapping(map) = item else {
                        return Err("each entry of 'columns' must be a mapping".to_string());
                    };
                    if map.len() != 1 {
                        return Err(format!(
                            "each entry of 'columns' must declare exactly one column, found {}",
                            map.len()
                        ));
                    }
                    for (name, dtype) in map {
                        columns.push(column_spec(&name, &dtype)?);
                    }
                }
            }
            _ => return Err("'columns' must be a mapping or a sequence".to_string()),
        }

        let mut schema = Schema::new(columns).map_err(|e| e.to_string())?;
        if let Some(threshold) = doc.imbalance_threshold {
            schema = schema
                .with_imbalance_threshold(threshold)
                .map_err(|e| e.to_string())?;
        }
        if let Some(target) = doc.target_column {
            if schema.dtype_of(&target).is_none() {
                return Err(format!(
                    "target column '{target}' is not declared in 'columns'"
                ));
            }
            schema = schema.with_target_column(target);
        }
        for name in &doc.numerical_columns {
            if schema.dtype_of(name).is_none() {
                return Err(format!(
                    "numerical column '{name}' is not declared in 'columns'"
                ));
            }
        }
        schema.numerical_columns = doc.numerical_columns;
        Ok(schema)
    }
}

/// On-disk shape of a schema document.
#[derive(Debug, Deserialize)]
struct SchemaDocument {
    columns: serde_yaml::Value,
    #[serde(default)]
    imbalance_threshold: Option<f64>,
    #[serde(default)]
    target_column: Option<String>,
    #[serde(default)]
    numerical_columns: Vec<String>,
}

fn column_spec(
    name: &serde_yaml::Value,
    dtype: &serde_yaml::Value,
) -> std::result::Result<ColumnSpec, String> {
    let name = name
        .as_str()
        .ok_or_else(|| format!("column name {name:?} is not a string"))?;
    let dtype = dtype
        .as_str()
        .ok_or_else(|| format!("type of column '{name}' is not a string"))?
        .parse()
        .map_err(|e| format!("column '{name}': {e}"))?;
    Ok(ColumnSpec {
        name: name.to_string(),
        dtype,
    })
}

/// Anything that can produce the schema for a validation run.
pub trait SchemaProvider {
    fn load_schema(&self) -> Result<Schema>;
}

/// Schema read from a YAML file.
#[derive(Debug, Clone)]
pub struct YamlSchemaFile {
    path: PathBuf,
}

impl YamlSchemaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SchemaProvider for YamlSchemaFile {
    fn load_schema(&self) -> Result<Schema> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(PipelineError::io("reading schema", &self.path))?;
        let schema = Schema::from_yaml_str(&content)
            .map_err(|message| PipelineError::document(&self.path, message))?;
        tracing::info!(
            path = %self.path.display(),
            columns = schema.len(),
            imbalance_threshold = schema.imbalance_threshold(),
            "Loaded schema"
        );
        Ok(schema)
    }
}

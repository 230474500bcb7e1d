//! Data layer: table model, schema documents, file store and record sources.

pub mod schema;
pub mod source;
pub mod store;
pub mod table;

pub use schema::{ColumnSpec, ColumnType, Schema, SchemaProvider, YamlSchemaFile};
pub use source::{
    CsvRecordSource, DataApiCollection, JsonlRecordSource, RecordSource, from_config,
};
pub use store::{CsvTableStore, TableStore};
pub use table::{Column, ColumnData, Record, Table};

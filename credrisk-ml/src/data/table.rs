//! In-memory, column-oriented table.
//!
//! Each column holds one homogeneous typed vector; `None` marks a missing
//! cell. All columns of a [`Table`] have the same length.

use crate::data::schema::ColumnType;
use crate::error::{PipelineError, Result};
use serde_json::{Map, Value};

/// A record as delivered by a record source.
pub type Record = Map<String, Value>;

/// Text cells treated as missing when parsing delimited files.
///
/// Any other spelling that parses as a float NaN (`NAN`, `+nan`, ...) is
/// missing as well.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

static NULL: Value = Value::Null;

const TRUE_LITERALS: &[&str] = &["True", "true", "TRUE"];
const FALSE_LITERALS: &[&str] = &["False", "false", "FALSE"];

/// Typed values of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> ColumnType {
        match self {
            ColumnData::Integer(_) => ColumnType::Integer,
            ColumnData::Float(_) => ColumnType::Float,
            ColumnData::Boolean(_) => ColumnType::Boolean,
            ColumnData::Categorical(_) => ColumnType::Categorical,
        }
    }

    pub fn missing_count(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Float(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Boolean(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Categorical(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Infer the column type from raw text cells.
    ///
    /// Integers with a missing cell widen to float, and a column with only
    /// missing cells is float. Surrounding whitespace is ignored for typed
    /// values; categorical cells keep their text as written.
    pub fn from_text<S: AsRef<str>>(cells: &[S]) -> Self {
        let present: Vec<Option<&str>> = cells
            .iter()
            .map(|c| {
                let c = c.as_ref();
                (!is_missing_text(c.trim())).then_some(c)
            })
            .collect();
        let has_missing = present.iter().any(Option::is_none);

        if let Some(ints) = parse_all(&present, |s| s.trim().parse::<i64>().ok()) {
            if !has_missing {
                return ColumnData::Integer(ints);
            }
        }
        if let Some(floats) = parse_all(&present, |s| s.trim().parse::<f64>().ok()) {
            return ColumnData::Float(floats);
        }
        if let Some(bools) = parse_all(&present, |s| parse_bool(s.trim())) {
            return ColumnData::Boolean(bools);
        }
        ColumnData::Categorical(present.iter().map(|c| c.map(str::to_string)).collect())
    }

    /// Infer the column type from JSON values.
    ///
    /// `null` and any string listed in `missing_markers` are missing. Mixed
    /// kinds fall back to categorical using each value's textual form.
    pub fn from_json(values: &[&Value], missing_markers: &[String]) -> Self {
        let present: Vec<Option<&Value>> = values
            .iter()
            .map(|v| match v {
                Value::Null => None,
                Value::String(s) if missing_markers.iter().any(|m| m == s) => None,
                other => Some(*other),
            })
            .collect();
        let has_missing = present.iter().any(Option::is_none);

        if let Some(ints) = parse_all(&present, Value::as_i64) {
            if !has_missing {
                return ColumnData::Integer(ints);
            }
        }
        if let Some(floats) = parse_all(&present, |v| v.is_number().then(|| v.as_f64()).flatten())
        {
            return ColumnData::Float(floats);
        }
        if let Some(bools) = parse_all(&present, Value::as_bool) {
            return ColumnData::Boolean(bools);
        }
        ColumnData::Categorical(
            present
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect(),
        )
    }

    /// Cell rendered for a delimited file; missing cells render empty.
    pub fn cell_text(&self, row: usize) -> String {
        match self {
            ColumnData::Integer(v) => v[row].map(|n| n.to_string()).unwrap_or_default(),
            ColumnData::Float(v) => v[row].map(format_float).unwrap_or_default(),
            ColumnData::Boolean(v) => v[row]
                .map(|b| (if b { "True" } else { "False" }).to_string())
                .unwrap_or_default(),
            ColumnData::Categorical(v) => v[row].clone().unwrap_or_default(),
        }
    }

    /// Cell as a JSON value; missing cells become `null`.
    pub fn cell_json(&self, row: usize) -> Value {
        match self {
            ColumnData::Integer(v) => v[row].map(Value::from).unwrap_or(Value::Null),
            ColumnData::Float(v) => v[row]
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ColumnData::Boolean(v) => v[row].map(Value::Bool).unwrap_or(Value::Null),
            ColumnData::Categorical(v) => v[row].clone().map(Value::String).unwrap_or(Value::Null),
        }
    }

    /// Non-missing values as numbers; `None` for categorical columns.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            ColumnData::Integer(v) => Some(v.iter().flatten().map(|&n| n as f64).collect()),
            ColumnData::Float(v) => Some(v.iter().flatten().copied().collect()),
            ColumnData::Boolean(v) => Some(
                v.iter()
                    .flatten()
                    .map(|&b| if b { 1.0 } else { 0.0 })
                    .collect(),
            ),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Label of every cell, with `None` for missing cells.
    pub fn labels(&self) -> Vec<Option<String>> {
        (0..self.len())
            .map(|row| match self {
                ColumnData::Categorical(v) => v[row].clone(),
                _ => {
                    let text = self.cell_text(row);
                    (!text.is_empty()).then_some(text)
                }
            })
            .collect()
    }

    /// Rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Self {
        match self {
            ColumnData::Integer(v) => ColumnData::Integer(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Float(v) => ColumnData::Float(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Boolean(v) => ColumnData::Boolean(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

fn parse_all<T, U, F>(cells: &[Option<T>], parse: F) -> Option<Vec<Option<U>>>
where
    T: Copy,
    F: Fn(T) -> Option<U>,
{
    cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(c) => parse(*c).map(Some),
        })
        .collect()
}

fn is_missing_text(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell) || cell.parse::<f64>().is_ok_and(f64::is_nan)
}

fn parse_bool(s: &str) -> Option<bool> {
    if TRUE_LITERALS.contains(&s) {
        Some(true)
    } else if FALSE_LITERALS.contains(&s) {
        Some(false)
    } else {
        None
    }
}

/// Shortest round-trip form, always with a fractional part for finite values.
fn format_float(value: f64) -> String {
    format!("{value:?}")
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn dtype(&self) -> ColumnType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Column-oriented table with positionally aligned rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, checking that names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let rows = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
                return Err(PipelineError::integrity(format!(
                    "column '{}' has {} rows, expected {rows}",
                    bad.name,
                    bad.len()
                )));
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(PipelineError::schema(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Build a table from raw text rows, inferring each column's type.
    pub fn from_text_rows(header: Vec<String>, rows: &[Vec<String>]) -> Result<Self> {
        let columns = header
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let cells: Vec<&str> = rows
                    .iter()
                    .map(|r| r.get(i).map(String::as_str).unwrap_or(""))
                    .collect();
                Column::new(name, ColumnData::from_text(&cells))
            })
            .collect();
        Self::new(columns)
    }

    /// Build a table from JSON records.
    ///
    /// Columns appear in first-seen key order; a key absent from a record
    /// is a missing cell. `drop_columns` are removed entirely.
    pub fn from_records(
        records: &[Record],
        drop_columns: &[String],
        missing_markers: &[String],
    ) -> Result<Self> {
        let mut names: Vec<&str> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.contains(&key.as_str()) && !drop_columns.contains(key) {
                    names.push(key);
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let values: Vec<&Value> = records
                    .iter()
                    .map(|r| r.get(name).unwrap_or(&NULL))
                    .collect();
                Column::new(name, ColumnData::from_json(&values, missing_markers))
            })
            .collect();
        Self::new(columns)
    }

    /// Rows as JSON records, preserving column order.
    pub fn to_records(&self) -> Vec<Record> {
        (0..self.n_rows())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.data.cell_json(row)))
                    .collect()
            })
            .collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Missing cells across every column and row.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(|c| c.data.missing_count()).sum()
    }

    /// A new table with the rows at `indices`.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(indices)))
                .collect(),
        }
    }

    /// Insert a column at `index`, shifting later columns right.
    pub fn insert_column(&mut self, index: usize, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(PipelineError::integrity(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.len(),
                self.n_rows()
            )));
        }
        if self.column(&column.name).is_some() {
            return Err(PipelineError::schema(format!(
                "duplicate column '{}'",
                column.name
            )));
        }
        self.columns.insert(index.min(self.columns.len()), column);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_infer_integer() {
        let data = ColumnData::from_text(&["1", "2", "-3"]);
        assert_eq!(data, ColumnData::Integer(vec![Some(1), Some(2), Some(-3)]));
    }

    #[test]
    fn test_integer_with_missing_widens_to_float() {
        let data = ColumnData::from_text(&["1", "", "3"]);
        assert_eq!(data, ColumnData::Float(vec![Some(1.0), None, Some(3.0)]));
        assert_eq!(data.missing_count(), 1);
    }

    #[test]
    fn test_all_missing_is_float() {
        let data = ColumnData::from_text(&["NA", "", "nan"]);
        assert_eq!(data.dtype(), ColumnType::Float);
        assert_eq!(data.missing_count(), 3);
    }

    #[test]
    fn test_nan_spellings_are_missing() {
        let data = ColumnData::from_text(&["1.5", "-nan", "NAN", "Nan", "+nan", "1.#QNAN", "#N/A"]);
        assert_eq!(data.dtype(), ColumnType::Float);
        assert_eq!(data.missing_count(), 6);

        let table = Table::from_text_rows(
            vec!["x".into(), "y".into()],
            &[
                vec!["1.5".into(), "1".into()],
                vec!["-nan".into(), "2".into()],
                vec!["NAN".into(), "3".into()],
            ],
        )
        .unwrap();
        assert_eq!(table.missing_count(), 2);
        assert_eq!(table.column("x").unwrap().data.cell_text(1), "");
    }

    #[test]
    fn test_categorical_keeps_surrounding_whitespace() {
        let data = ColumnData::from_text(&[" car", "radio ", "  "]);
        assert_eq!(
            data,
            ColumnData::Categorical(vec![Some(" car".into()), Some("radio ".into()), None])
        );
        assert_eq!(
            ColumnData::from_text(&[" 12", "7 "]),
            ColumnData::Integer(vec![Some(12), Some(7)])
        );
    }

    #[test]
    fn test_infer_float_bool_categorical() {
        assert_eq!(
            ColumnData::from_text(&["1.5", "2"]).dtype(),
            ColumnType::Float
        );
        assert_eq!(
            ColumnData::from_text(&["True", "false"]).dtype(),
            ColumnType::Boolean
        );
        assert_eq!(
            ColumnData::from_text(&["car", "1"]).dtype(),
            ColumnType::Categorical
        );
    }

    #[test]
    fn test_cell_text_formatting() {
        let floats = ColumnData::Float(vec![Some(1.0), Some(0.25), None]);
        assert_eq!(floats.cell_text(0), "1.0");
        assert_eq!(floats.cell_text(1), "0.25");
        assert_eq!(floats.cell_text(2), "");
        let bools = ColumnData::Boolean(vec![Some(true), Some(false)]);
        assert_eq!(bools.cell_text(0), "True");
        // Formatted floats parse back to the same type.
        let reparsed = ColumnData::from_text(&[floats.cell_text(0), floats.cell_text(1)]);
        assert_eq!(reparsed, ColumnData::Float(vec![Some(1.0), Some(0.25)]));
    }

    #[test]
    fn test_table_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::new("a", ColumnData::Integer(vec![Some(1), Some(2)])),
            Column::new("b", ColumnData::Integer(vec![Some(1)])),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::Integrity(_)));
    }

    #[test]
    fn test_table_rejects_duplicate_names() {
        let err = Table::new(vec![
            Column::new("a", ColumnData::Integer(vec![Some(1)])),
            Column::new("a", ColumnData::Integer(vec![Some(2)])),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_from_records_drops_columns_and_markers() {
        let records: Vec<Record> = vec![
            json!({"_id": "x1", "age": 31, "purpose": "car", "amount": 1200.5}),
            json!({"_id": "x2", "age": 45, "purpose": "na", "amount": 800}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();

        let table =
            Table::from_records(&records, &["_id".to_string()], &["na".to_string()]).unwrap();
        assert_eq!(table.column_names(), vec!["age", "purpose", "amount"]);
        assert_eq!(table.column("age").unwrap().dtype(), ColumnType::Integer);
        assert_eq!(table.column("amount").unwrap().dtype(), ColumnType::Float);
        assert_eq!(
            table.column("purpose").unwrap().data,
            ColumnData::Categorical(vec![Some("car".into()), None])
        );
        assert_eq!(table.missing_count(), 1);
    }

    #[test]
    fn test_take_rows_and_records() {
        let table = Table::new(vec![
            Column::new("id", ColumnData::Integer(vec![Some(1), Some(2), Some(3)])),
            Column::new(
                "label",
                ColumnData::Categorical(vec![Some("a".into()), Some("b".into()), None]),
            ),
        ])
        .unwrap();
        let subset = table.take_rows(&[2, 0]);
        assert_eq!(subset.n_rows(), 2);
        let records = subset.to_records();
        assert_eq!(records[0]["id"], json!(3));
        assert_eq!(records[0]["label"], Value::Null);
        assert_eq!(records[1]["label"], json!("a"));
    }

    #[test]
    fn test_insert_column() {
        let mut table = Table::new(vec![Column::new(
            "age",
            ColumnData::Integer(vec![Some(30), Some(40)]),
        )])
        .unwrap();
        table
            .insert_column(0, Column::new("id", ColumnData::Integer(vec![Some(1), Some(2)])))
            .unwrap();
        assert_eq!(table.column_names(), vec!["id", "age"]);
        assert!(
            table
                .insert_column(0, Column::new("x", ColumnData::Integer(vec![Some(1)])))
                .is_err()
        );
    }
}

//! Schema conformance: column count and declared column types.

use crate::data::schema::Schema;
use crate::data::table::Table;

/// True iff the table has exactly as many columns as the schema declares.
pub fn validate_column_count(table: &Table, schema: &Schema) -> bool {
    let required = schema.len();
    let actual = table.n_columns();
    tracing::info!(
        "Required number of columns: {required}, actual number of columns: {actual}"
    );
    required == actual
}

/// True iff every declared column exists with exactly the declared type.
///
/// Stops at the first mismatch; later columns are not checked. A declared
/// column that is absent from the table counts as a mismatch.
pub fn validate_column_types(table: &Table, schema: &Schema) -> bool {
    for spec in schema.columns() {
        let Some(column) = table.column(&spec.name) else {
            tracing::error!(column = %spec.name, "Declared column is missing from the dataset");
            return false;
        };
        if column.dtype() != spec.dtype {
            tracing::error!(
                "Column {} has incorrect data type. Expected: {}, got: {}",
                spec.name,
                spec.dtype,
                column.dtype()
            );
            return false;
        }
    }
    true
}

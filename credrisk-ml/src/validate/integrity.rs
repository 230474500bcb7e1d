//! Missing-value checks.

use crate::data::table::Table;

/// True iff no cell of the table is missing.
pub fn validate_no_missing(table: &Table) -> bool {
    let missing = table.missing_count();
    if missing > 0 {
        tracing::error!("Dataframe contains {missing} missing values");
        return false;
    }
    true
}

//! Dataset validators: schema conformance, integrity, class balance and drift.

pub mod balance;
pub mod drift;
pub mod integrity;
pub mod schema;

pub use balance::{ClassShare, class_distribution, inspect_balance};
pub use drift::{
    ColumnDrift, DEFAULT_DRIFT_THRESHOLD, DriftDetector, DriftReport, KsResult, ks_2samp,
};
pub use integrity::validate_no_missing;
pub use schema::{validate_column_count, validate_column_types};

//! Property-based tests for the validators using proptest.

use proptest::prelude::*;

use credrisk_ml::data::{Column, ColumnData, ColumnSpec, ColumnType, Schema, Table};
use credrisk_ml::validate::{
    DriftDetector, ks_2samp, validate_column_count, validate_column_types, validate_no_missing,
};

fn int_table(n_columns: usize, rows: usize) -> Table {
    Table::new(
        (0..n_columns)
            .map(|i| {
                Column::new(
                    format!("c{i}"),
                    ColumnData::Integer((0..rows as i64).map(Some).collect()),
                )
            })
            .collect(),
    )
    .unwrap()
}

fn int_schema(n_columns: usize) -> Schema {
    Schema::new(
        (0..n_columns)
            .map(|i| ColumnSpec {
                name: format!("c{i}"),
                dtype: ColumnType::Integer,
            })
            .collect(),
    )
    .unwrap()
}

// --- Schema conformance ---

proptest! {
    #[test]
    fn column_count_matches_only_when_equal(
        table_cols in 1usize..12,
        schema_cols in 1usize..12,
        rows in 0usize..20,
    ) {
        let table = int_table(table_cols, rows);
        let schema = int_schema(schema_cols);
        prop_assert_eq!(validate_column_count(&table, &schema), table_cols == schema_cols);
    }

    #[test]
    fn matching_types_always_validate(n_columns in 1usize..10, rows in 1usize..20) {
        let table = int_table(n_columns, rows);
        prop_assert!(validate_column_types(&table, &int_schema(n_columns)));
    }
}

// --- Integrity ---

proptest! {
    #[test]
    fn no_missing_iff_every_cell_present(
        cells in prop::collection::vec(prop::option::weighted(0.9, any::<i32>()), 1..100)
    ) {
        let expected = cells.iter().all(Option::is_some);
        let data = ColumnData::Float(cells.iter().map(|c| c.map(f64::from)).collect());
        let table = Table::new(vec![Column::new("x", data)]).unwrap();
        prop_assert_eq!(validate_no_missing(&table), expected);
    }
}

// --- Drift ---

proptest! {
    #[test]
    fn self_comparison_never_drifts(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200)
    ) {
        let data = ColumnData::Float(values.into_iter().map(Some).collect());
        let result = ks_2samp(&data, &data).unwrap();
        prop_assert_eq!(result.statistic, 0.0);
        prop_assert_eq!(result.p_value, 1.0);

        let table = Table::new(vec![Column::new("x", data)]).unwrap();
        let report = DriftDetector::new("unused.yaml").compare(&table, &table).unwrap();
        prop_assert!(report.is_drift_free());
    }

    #[test]
    fn ks_statistic_and_p_value_are_bounded(
        a in prop::collection::vec(0i64..50, 1..100),
        b in prop::collection::vec(0i64..50, 1..100),
    ) {
        let a = ColumnData::Integer(a.into_iter().map(Some).collect());
        let b = ColumnData::Integer(b.into_iter().map(Some).collect());
        let forward = ks_2samp(&a, &b).unwrap();
        let backward = ks_2samp(&b, &a).unwrap();
        prop_assert!((0.0..=1.0).contains(&forward.statistic));
        prop_assert!((0.0..=1.0).contains(&forward.p_value));
        prop_assert!((forward.statistic - backward.statistic).abs() < 1e-12);
    }
}

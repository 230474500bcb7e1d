//! Class balance inspection for the target column. Advisory only.

use crate::data::table::Table;
use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Share of one class among the labelled rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassShare {
    pub label: String,
    pub share: f64,
}

/// Normalized frequency of each distinct value of `target_column`.
///
/// Missing cells are not counted. Ordered by descending share, ties by label.
pub fn class_distribution(table: &Table, target_column: &str) -> Result<Vec<ClassShare>> {
    let column = table.column(target_column).ok_or_else(|| {
        PipelineError::schema(format!("target column '{target_column}' is not in the dataset"))
    })?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in column.data.labels().into_iter().flatten() {
        *counts.entry(label).or_default() += 1;
    }
    let total: usize = counts.values().sum();

    let mut shares: Vec<(String, usize)> = counts.into_iter().collect();
    shares.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(shares
        .into_iter()
        .map(|(label, count)| ClassShare {
            label,
            share: count as f64 / total as f64,
        })
        .collect())
}

/// Warn when any class's share is strictly below `threshold`.
///
/// Always returns `Ok(true)`: imbalance never blocks the pipeline. Fails only
/// when the target column does not exist.
pub fn inspect_balance(table: &Table, target_column: &str, threshold: f64) -> Result<bool> {
    let distribution = class_distribution(table, target_column)?;
    if distribution.iter().any(|c| c.share < threshold) {
        let summary = distribution
            .iter()
            .map(|c| format!("{}={:.4}", c.label, c.share))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::warn!(
            threshold,
            "Class imbalance detected in column {target_column}. Distribution: {summary}"
        );
    } else {
        tracing::debug!(column = target_column, classes = distribution.len(), "Classes balanced");
    }
    Ok(true)
}

//! Two-sample drift detection between a base and a current table.
//!
//! Every column is compared with the Kolmogorov–Smirnov test. The statistic
//! is the largest gap between the two empirical CDFs; the p-value comes from
//! the asymptotic Kolmogorov distribution with Stephens' small-sample
//! correction, so results are deterministic for identical inputs.

use crate::data::table::{ColumnData, Table};
use crate::error::{PipelineError, Result};
use credrisk_core::persistence::{atomic_write_yaml, load_yaml};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// p-value below which a column counts as drifted.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.05;

/// Outcome of a two-sample Kolmogorov–Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Totally ordered float so numeric samples can be sorted.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample(f64);

impl Eq for Sample {}

impl PartialOrd for Sample {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sample {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Run the KS test on two columns, ignoring missing cells.
///
/// Numeric columns (integer, float, boolean) compare by value; categorical
/// columns compare by label order. Mixing the two is an error.
pub fn ks_2samp(base: &ColumnData, current: &ColumnData) -> Result<KsResult> {
    let statistic = match (base.numeric_values(), current.numeric_values()) {
        (Some(a), Some(b)) => {
            let mut a: Vec<Sample> = a.into_iter().map(Sample).collect();
            let mut b: Vec<Sample> = b.into_iter().map(Sample).collect();
            ensure_non_empty(a.len(), b.len())?;
            a.sort_unstable();
            b.sort_unstable();
            ks_statistic(&a, &b)
        }
        (None, None) => {
            let mut a: Vec<String> = base.labels().into_iter().flatten().collect();
            let mut b: Vec<String> = current.labels().into_iter().flatten().collect();
            ensure_non_empty(a.len(), b.len())?;
            a.sort_unstable();
            b.sort_unstable();
            ks_statistic(&a, &b)
        }
        _ => {
            return Err(PipelineError::drift(format!(
                "cannot compare a {} column with a {} column",
                base.dtype(),
                current.dtype()
            )));
        }
    };

    let n1 = base.len() - base.missing_count();
    let n2 = current.len() - current.missing_count();
    Ok(KsResult {
        statistic,
        p_value: ks_p_value(statistic, n1, n2),
    })
}

fn ensure_non_empty(n1: usize, n2: usize) -> Result<()> {
    if n1 == 0 || n2 == 0 {
        return Err(PipelineError::drift(format!(
            "empty sample (base has {n1} values, current has {n2})"
        )));
    }
    Ok(())
}

/// Largest absolute gap between the empirical CDFs of two sorted samples.
///
/// Both CDFs are evaluated after every distinct value, so ties across the
/// samples are stepped over together.
fn ks_statistic<T: Ord>(a: &[T], b: &[T]) -> f64 {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let value = if a[i] <= b[j] { &a[i] } else { &b[j] };
        while i < a.len() && a[i] <= *value {
            i += 1;
        }
        while j < b.len() && b[j] <= *value {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }
    d
}

/// Two-sided p-value for statistic `d` with sample sizes `n1`, `n2`.
fn ks_p_value(d: f64, n1: usize, n2: usize) -> f64 {
    let (n1, n2) = (n1 as f64, n2 as f64);
    let en = (n1 * n2 / (n1 + n2)).sqrt();
    kolmogorov_survival((en + 0.12 + 0.11 / en) * d)
}

/// Q_KS(λ) = 2 Σ (-1)^(k-1) exp(-2k²λ²), with the dual series for small λ.
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let q = if lambda < 1.18 {
        let y = (-std::f64::consts::PI.powi(2) / (8.0 * lambda * lambda)).exp();
        let cdf = (2.0 * std::f64::consts::PI).sqrt() / lambda
            * (y + y.powi(9) + y.powi(25) + y.powi(49));
        1.0 - cdf
    } else {
        let x = (-2.0 * lambda * lambda).exp();
        2.0 * (x - x.powi(4) + x.powi(9))
    };
    q.clamp(0.0, 1.0)
}

/// Drift outcome for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDrift {
    pub column: String,
    pub p_value: f64,
    pub drift_status: bool,
}

#[derive(Serialize, Deserialize)]
struct ReportEntry {
    p_value: f64,
    drift_status: bool,
}

/// Per-column drift results, in the base table's column order.
///
/// Serialized as `{column: {p_value, drift_status}, ...}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriftReport {
    columns: Vec<ColumnDrift>,
}

impl DriftReport {
    pub fn columns(&self) -> &[ColumnDrift] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// True when no column drifted.
    pub fn is_drift_free(&self) -> bool {
        self.columns.iter().all(|c| !c.drift_status)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.drift_status)
            .map(|c| c.column.as_str())
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_yaml(path, self).map_err(PipelineError::io("writing drift report", path))?;
        tracing::info!(path = %path.display(), columns = self.len(), "Saved drift report");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_yaml(path)
            .map_err(PipelineError::io("reading drift report", path))?
            .ok_or_else(|| PipelineError::document(path, "drift report does not exist"))
    }
}

impl Serialize for DriftReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for c in &self.columns {
            map.serialize_entry(
                &c.column,
                &ReportEntry {
                    p_value: c.p_value,
                    drift_status: c.drift_status,
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DriftReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ReportVisitor;

        impl<'de> Visitor<'de> for ReportVisitor {
            type Value = DriftReport;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of column name to {p_value, drift_status}")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<DriftReport, A::Error> {
                let mut columns = Vec::new();
                while let Some((column, entry)) = access.next_entry::<String, ReportEntry>()? {
                    columns.push(ColumnDrift {
                        column,
                        p_value: entry.p_value,
                        drift_status: entry.drift_status,
                    });
                }
                Ok(DriftReport { columns })
            }
        }

        deserializer.deserialize_map(ReportVisitor)
    }
}

/// Compares two tables column by column and persists the report.
#[derive(Debug, Clone)]
pub struct DriftDetector {
    threshold: f64,
    report_path: PathBuf,
}

impl DriftDetector {
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        Self {
            threshold: DEFAULT_DRIFT_THRESHOLD,
            report_path: report_path.into(),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Build the report without persisting it.
    ///
    /// Every column of `base` must also exist in `current`.
    pub fn compare(&self, base: &Table, current: &Table) -> Result<DriftReport> {
        let mut columns = Vec::with_capacity(base.n_columns());
        for column in base.columns() {
            let other = current.column(&column.name).ok_or_else(|| {
                PipelineError::schema(format!(
                    "column '{}' is missing from the current dataset",
                    column.name
                ))
            })?;
            let result = ks_2samp(&column.data, &other.data).map_err(|e| match e {
                PipelineError::Drift(msg) => {
                    PipelineError::drift(format!("column '{}': {msg}", column.name))
                }
                e => e,
            })?;
            let drift_status = result.p_value < self.threshold;
            tracing::debug!(
                column = %column.name,
                statistic = result.statistic,
                p_value = result.p_value,
                drift_status,
                "KS test"
            );
            columns.push(ColumnDrift {
                column: column.name.clone(),
                p_value: result.p_value,
                drift_status,
            });
        }
        Ok(DriftReport { columns })
    }

    /// Compare, persist the report, and return whether the tables are
    /// drift-free together with the report.
    pub fn detect(&self, base: &Table, current: &Table) -> Result<(bool, DriftReport)> {
        let report = self.compare(base, current)?;
        report.save(&self.report_path)?;
        let status = report.is_drift_free();
        if status {
            tracing::info!(columns = report.len(), "No dataset drift detected");
        } else {
            tracing::warn!(drifted = ?report.drifted_columns(), "Dataset drift detected");
        }
        Ok((status, report))
    }
}

//! Descriptive statistics and z-score anomaly detection
//!
//! All reductions skip missing (NaN) values and use population moments
//! (divisor N, the count of present values).

use crate::models::ObservationTable;
use serde::Serialize;

/// Default anomaly threshold, in standard deviations
pub const DEFAULT_Z_THRESHOLD: f64 = 2.5;

/// Population statistics of a series
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSummary {
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
}

impl StatsSummary {
    const UNDEFINED: StatsSummary = StatsSummary {
        mean: f64::NAN,
        variance: f64::NAN,
        std: f64::NAN,
    };
}

/// Statistics and anomaly flags for one variable
#[derive(Debug, Clone, Serialize)]
pub struct VariableAnalysis {
    pub variable: String,
    pub stats: StatsSummary,
    pub anomalies: Vec<bool>,
    pub anomaly_count: usize,
}

/// Running sums over the present values of a series
struct Accumulator {
    n_vals: usize,
    sum: f64,
}

impl Accumulator {
    fn over(series: &[f64]) -> Self {
        series
            .iter()
            .filter(|v| !v.is_nan())
            .fold(Self { n_vals: 0, sum: 0.0 }, |acc, v| Self {
                n_vals: acc.n_vals + 1,
                sum: acc.sum + v,
            })
    }

    fn mean(&self) -> f64 {
        if self.n_vals == 0 {
            f64::NAN
        } else {
            self.sum / self.n_vals as f64
        }
    }
}

/// NaN-aware population mean, variance and standard deviation.
///
/// An empty or all-missing series yields NaN for every field.
#[must_use]
pub fn compute_stats(series: &[f64]) -> StatsSummary {
    let acc = Accumulator::over(series);
    if acc.n_vals == 0 {
        return StatsSummary::UNDEFINED;
    }

    let mean = acc.mean();
    let diff_2_sum: f64 = series
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - mean).powi(2))
        .sum();
    let variance = diff_2_sum / acc.n_vals as f64;

    StatsSummary {
        mean,
        variance,
        std: variance.sqrt(),
    }
}

/// Flag values whose absolute z-score exceeds `z_threshold`.
///
/// Constant and all-missing series have no anomalies. Missing values are
/// never flagged.
#[must_use]
pub fn detect_anomalies(series: &[f64], z_threshold: f64) -> Vec<bool> {
    if series.is_empty() {
        return Vec::new();
    }

    let StatsSummary { mean, std, .. } = compute_stats(series);
    if std == 0.0 || std.is_nan() {
        return vec![false; series.len()];
    }

    series
        .iter()
        .map(|v| ((v - mean) / std).abs() > z_threshold)
        .collect()
}

/// Statistics and anomaly flags for one named series
#[must_use]
pub fn analyze_series(variable: &str, series: &[f64], z_threshold: f64) -> VariableAnalysis {
    let anomalies = detect_anomalies(series, z_threshold);
    VariableAnalysis {
        variable: variable.to_string(),
        stats: compute_stats(series),
        anomaly_count: anomalies.iter().filter(|&&flag| flag).count(),
        anomalies,
    }
}

/// Analyze every series of a table, in table order
#[must_use]
pub fn analyze_table(table: &ObservationTable, z_threshold: f64) -> Vec<VariableAnalysis> {
    table
        .series
        .iter()
        .map(|s| analyze_series(&s.name, &s.values, z_threshold))
        .collect()
}

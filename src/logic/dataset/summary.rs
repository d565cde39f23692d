//! Feature Summaries & Histograms
//!
//! Statistics only ever see values that parse to finite numbers; missing and
//! non-numeric cells are excluded, never coerced to zero.

use serde::{Deserialize, Serialize};

use super::{cell_number, column_names, numeric_values, Row};

/// Per-column numeric summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub feature: String,
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (divides by count)
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl FeatureSummary {
    fn from_values(feature: &str, values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                feature: feature.to_string(),
                count: 0,
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let (min, max) = min_max(values);

        Self {
            feature: feature.to_string(),
            count: values.len(),
            mean,
            std: variance.sqrt(),
            min,
            max,
        }
    }
}

/// One histogram bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Lower edge, two decimals
    pub bin: String,
    pub lower_edge: f64,
    pub count: usize,
}

/// Summaries for every column holding at least one numeric value.
///
/// Columns come out in order of first appearance. A column is numeric when
/// any row has a number in it, not all rows.
pub fn summarize(rows: &[Row]) -> Vec<FeatureSummary> {
    column_names(rows)
        .iter()
        .filter(|name| {
            rows.iter()
                .any(|row| row.get(name.as_str()).and_then(cell_number).is_some())
        })
        .map(|name| FeatureSummary::from_values(name, &numeric_values(rows, name)))
        .collect()
}

/// Histogram of one feature over `bin_count` equal-width bins.
///
/// Width falls back to 1 for a constant column; the last bin absorbs values
/// landing exactly on the max. No numeric values (or zero bins) -> no bins.
pub fn histogram(rows: &[Row], feature: &str, bin_count: usize) -> Vec<HistogramBin> {
    let values = numeric_values(rows, feature);
    if values.is_empty() || bin_count == 0 {
        return Vec::new();
    }

    let (min, max) = min_max(&values);
    let mut width = (max - min) / bin_count as f64;
    if width == 0.0 || !width.is_finite() {
        width = 1.0;
    }

    let mut counts = vec![0usize; bin_count];
    for v in &values {
        let idx = ((v - min) / width).floor();
        let idx = if idx.is_nan() || idx < 0.0 {
            0
        } else {
            (idx as usize).min(bin_count - 1)
        };
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower_edge = min + i as f64 * width;
            HistogramBin {
                bin: format!("{:.2}", lower_edge),
                lower_edge,
                count,
            }
        })
        .collect()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(*v), hi.max(*v))
    })
}

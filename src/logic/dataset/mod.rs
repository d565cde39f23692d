//! Dataset Module - Uploaded Tabular Data
//!
//! Turns an uploaded CSV into rows, and rows into per-feature summaries and
//! histograms for the features explorer. Also writes CSV for report exports.
//!
//! A malformed upload never errors toward the caller: it becomes an empty
//! row-set and every downstream view degrades to "no data".

pub mod csv;
pub mod summary;

#[cfg(test)]
mod tests;

pub use self::csv::{parse_csv, parse_rows_lossy, read_rows, write_csv, CsvError};
pub use summary::{histogram, summarize, FeatureSummary, HistogramBin};

use serde_json::{Map, Value};

/// One uploaded row: column name -> type-inferred cell, in header order.
pub type Row = Map<String, Value>;

/// Numeric view of a cell.
///
/// JSON numbers and strings holding a finite float count; null, booleans,
/// free text and NaN/inf do not.
pub fn cell_number(cell: &Value) -> Option<f64> {
    let value = match cell {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Column names in order of first appearance across all rows.
pub fn column_names(rows: &[Row]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }
    names
}

/// Finite numeric values of one column, in row order; missing cells skipped.
pub fn numeric_values(rows: &[Row], column: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter_map(cell_number)
        .collect()
}

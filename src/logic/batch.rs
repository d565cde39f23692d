//! Batch Runner - scores every row of an uploaded dataset
//!
//! Rows are scored strictly one after another. A failed row becomes an
//! error-tagged outcome and the run carries on; every outcome is also written
//! to history as a `batch` record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::logic::dataset::{column_names, write_csv, Row};
use crate::logic::history::{HistoryStore, PredictionRecord, PredictionSource};
use crate::logic::scoring::{FeatureVector, ScoreResult, Scorer};

/// Result for one input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Position in the uploaded row-set
    pub index: usize,
    pub input: Row,
    pub outcome: ScoreResult,
}

/// Ordered outcomes plus aggregate counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub above_threshold: usize,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<BatchOutcome>, threshold: f64) -> Self {
        let failed = outcomes.iter().filter(|o| o.outcome.is_error()).count();
        let above_threshold = outcomes.iter().filter(|o| o.outcome.exceeds(threshold)).count();

        Self {
            total: outcomes.len(),
            succeeded: outcomes.len() - failed,
            failed,
            above_threshold,
            outcomes,
        }
    }

    /// Input columns, then `failure_probability` and `error`, one line per row
    pub fn to_csv(&self) -> String {
        let inputs: Vec<Row> = self.outcomes.iter().map(|o| o.input.clone()).collect();
        let mut header = column_names(&inputs);
        header.retain(|c| c != "failure_probability" && c != "error");
        let columns = header.clone();
        header.push("failure_probability".to_string());
        header.push("error".to_string());

        let rows = self.outcomes.iter().map(|o| {
            let mut line: Vec<String> = columns
                .iter()
                .map(|c| o.input.get(c).map(cell_text).unwrap_or_default())
                .collect();
            line.push(o.outcome.probability().map(|p| p.to_string()).unwrap_or_default());
            line.push(o.outcome.error().unwrap_or_default().to_string());
            line
        });

        write_csv(&header, rows)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct BatchRunner<S: Scorer> {
    scorer: Arc<S>,
    history: Arc<HistoryStore>,
}

impl<S: Scorer> BatchRunner<S> {
    pub fn new(scorer: Arc<S>, history: Arc<HistoryStore>) -> Self {
        Self { scorer, history }
    }

    /// Score `rows` in order; `threshold` is a fraction of 1.0 used for the
    /// above-threshold count only
    pub async fn run_batch(&self, rows: &[Row], threshold: f64) -> BatchReport {
        log::info!("Batch run started: {} rows", rows.len());
        let mut outcomes = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let vector = FeatureVector::from_row(row);
            let outcome = self.scorer.score(&vector).await;

            if let Some(err) = outcome.error() {
                log::warn!("Batch row {} failed: {}", index, err);
            }

            self.history.append(PredictionRecord::new(
                PredictionSource::Batch,
                vector,
                outcome.clone(),
            ));

            outcomes.push(BatchOutcome {
                index,
                input: row.clone(),
                outcome,
            });
        }

        let report = BatchReport::from_outcomes(outcomes, threshold);
        log::info!(
            "Batch run finished: {} rows, {} ok, {} failed, {} above threshold",
            report.total,
            report.succeeded,
            report.failed,
            report.above_threshold
        );
        report
    }
}

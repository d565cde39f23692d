//! Prediction History - ordered, persisted log of scoring attempts
//!
//! Flow:
//! 1. Manual form, batch runner and real-time monitor each call `append`
//! 2. Records are kept newest first and written through to local storage
//! 3. `clear` wipes the log (the only way records are destroyed, apart from
//!    FIFO eviction when a limit is configured)


use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use crate::logic::dataset::write_csv;
use crate::logic::scoring::{FeatureVector, ScoreResult};
use crate::logic::storage::LocalStore;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Storage key of the persisted log
pub const HISTORY_KEY: &str = "history";

// ============================================================================
// RECORD
// ============================================================================

/// Which producer created a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Manual,
    Batch,
    Monitor,
}

/// One completed scoring attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    /// Caller-supplied request id, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub source: PredictionSource,
    pub input: FeatureVector,
    pub result: ScoreResult,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(source: PredictionSource, input: FeatureVector, result: ScoreResult) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request_id: None,
            source,
            input,
            result,
            timestamp: Utc::now(),
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Point on the probability-over-time chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub probability: f64,
}

// ============================================================================
// STORE
// ============================================================================

/// Newest-first log shared by every producer.
///
/// Each call holds the lock for its whole read-modify-write, so interleaved
/// producers never lose an update.
pub struct HistoryStore {
    records: Mutex<VecDeque<PredictionRecord>>,
    storage: Arc<LocalStore>,
    limit: Option<usize>,
}

impl HistoryStore {
    /// Load the persisted log (corrupt or missing -> empty)
    pub fn load(storage: Arc<LocalStore>, limit: Option<usize>) -> Self {
        let mut records: VecDeque<PredictionRecord> = storage.get_setting(HISTORY_KEY, VecDeque::new());
        if let Some(max) = limit {
            records.truncate(max);
        }

        log::info!(
            "Prediction history loaded: {} records (limit: {})",
            records.len(),
            limit.map_or_else(|| "none".to_string(), |l| l.to_string())
        );

        Self {
            records: Mutex::new(records),
            storage,
            limit,
        }
    }

    /// Prepend a record; evicts from the oldest end when over the limit
    pub fn append(&self, record: PredictionRecord) {
        let mut records = self.records.lock();
        log::debug!("History append: {} ({:?})", record.id, record.source);
        records.push_front(record);

        if let Some(max) = self.limit {
            while records.len() > max {
                records.pop_back();
            }
        }

        self.storage.set_setting(HISTORY_KEY, &*records);
    }

    pub fn clear(&self) {
        let mut records = self.records.lock();
        let removed = records.len();
        records.clear();
        self.storage.set_setting(HISTORY_KEY, &*records);
        log::info!("Prediction history cleared ({} records)", removed);
    }

    /// Full log, newest first
    pub fn records(&self) -> Vec<PredictionRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn recent(&self, limit: usize) -> Vec<PredictionRecord> {
        self.records.lock().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Last `limit` successful probabilities, oldest first
    pub fn probability_trend(&self, limit: usize) -> Vec<TrendPoint> {
        let records = self.records.lock();
        let mut points: Vec<TrendPoint> = records
            .iter()
            .filter_map(|r| {
                r.result.probability().map(|probability| TrendPoint {
                    timestamp: r.timestamp,
                    probability,
                })
            })
            .take(limit)
            .collect();
        points.reverse();
        points
    }

    /// Export the log as CSV (newest first), one column per feature seen
    pub fn export_csv(&self) -> String {
        let records = self.records();

        let mut features: Vec<String> = Vec::new();
        for record in &records {
            for name in record.input.names() {
                if !features.iter().any(|f| f == name) {
                    features.push(name.to_string());
                }
            }
        }
        features.sort();

        let mut header = vec![
            "timestamp".to_string(),
            "id".to_string(),
            "request_id".to_string(),
            "source".to_string(),
        ];
        header.extend(features.iter().cloned());
        header.push("failure_probability".to_string());
        header.push("error".to_string());

        let rows = records.iter().map(|r| {
            let mut row = vec![
                r.timestamp.to_rfc3339(),
                r.id.clone(),
                r.request_id.clone().unwrap_or_default(),
                format!("{:?}", r.source).to_lowercase(),
            ];
            row.extend(
                features
                    .iter()
                    .map(|f| r.input.get(f).map(|v| v.to_string()).unwrap_or_default()),
            );
            row.push(r.result.probability().map(|p| p.to_string()).unwrap_or_default());
            row.push(r.result.error().unwrap_or_default().to_string());
            row
        });

        write_csv(&header, rows)
    }
}

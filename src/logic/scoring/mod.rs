//! Scoring Module - Remote Failure Prediction
//!
//! This module handles:
//! - The feature vector payload sent for scoring
//! - The probability-or-error outcome of one scoring attempt
//! - The `Scorer` seam used by the monitor, batch runner and manual form
//! - The HTTP client for the prediction service (`client`)

pub mod client;
#[cfg(test)]
pub mod mock;

pub use client::{BackendStatus, ModelInfo, ScoreError, ScoringClient, ScoringConfig};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// Named numeric inputs submitted for scoring.
///
/// Keys are caller-defined. Non-finite values are dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; returns false when the value is NaN or infinite.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.0.insert(name.into(), value);
        true
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Build a vector from an uploaded row, keeping only cells that parse to
    /// finite numbers.
    pub fn from_row(row: &serde_json::Map<String, Value>) -> Self {
        let mut vector = Self::new();
        for (name, cell) in row {
            if let Some(value) = crate::logic::dataset::cell_number(cell) {
                vector.insert(name.clone(), value);
            }
        }
        vector
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut vector = Self::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}

/// Why a scoring attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No answer within the request timeout
    Timeout,
    /// Connection refused, DNS failure, or request never completed
    Unreachable,
    /// Service answered with a non-2xx status
    HttpStatus(u16),
    /// Service answered 2xx with an `{error}` body
    Rejected,
    /// Body could not be parsed or the probability was outside [0, 1]
    InvalidResponse,
}

impl Default for FailureKind {
    fn default() -> Self {
        Self::InvalidResponse
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Unreachable => write!(f, "unreachable"),
            Self::HttpStatus(code) => write!(f, "http {}", code),
            Self::Rejected => write!(f, "rejected"),
            Self::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Outcome of one scoring attempt: a probability or an error, never both.
///
/// Serializes as `{"failure_probability": p}` or `{"error": "...", "kind": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreResult {
    Success {
        failure_probability: f64,
    },
    Failed {
        error: String,
        #[serde(default)]
        kind: FailureKind,
    },
}

impl ScoreResult {
    /// Successful outcome; `None` when the probability is outside [0, 1].
    pub fn success(probability: f64) -> Option<Self> {
        if probability.is_finite() && (0.0..=1.0).contains(&probability) {
            Some(Self::Success { failure_probability: probability })
        } else {
            None
        }
    }

    pub fn failed(kind: FailureKind, error: impl Into<String>) -> Self {
        Self::Failed { error: error.into(), kind }
    }

    pub fn probability(&self) -> Option<f64> {
        match self {
            Self::Success { failure_probability } => Some(*failure_probability),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    pub fn failure_kind(&self) -> Option<&FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failed { kind, .. } => Some(kind),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// True when the probability is strictly above `threshold` (a fraction of 1.0).
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.probability().map_or(false, |p| p > threshold)
    }
}

/// Anything that can turn a feature vector into a score.
///
/// Implementations never fail: transport problems come back as
/// `ScoreResult::Failed`.
pub trait Scorer: Send + Sync + 'static {
    fn score(&self, vector: &FeatureVector) -> impl Future<Output = ScoreResult> + Send;

    /// Score with a caller-supplied request id; scorers without ids ignore it
    fn score_tagged(
        &self,
        vector: &FeatureVector,
        _id: Option<&str>,
    ) -> impl Future<Output = ScoreResult> + Send {
        self.score(vector)
    }
}

/// Format a probability the way alerts and reports show it ("82.0%").
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rejects_out_of_range() {
        assert!(ScoreResult::success(0.5).is_some());
        assert!(ScoreResult::success(0.0).is_some());
        assert!(ScoreResult::success(1.0).is_some());
        assert!(ScoreResult::success(1.2).is_none());
        assert!(ScoreResult::success(-0.1).is_none());
        assert!(ScoreResult::success(f64::NAN).is_none());
    }

    #[test]
    fn test_error_and_probability_are_exclusive() {
        let ok = ScoreResult::success(0.3).unwrap();
        assert_eq!(ok.probability(), Some(0.3));
        assert!(ok.error().is_none());

        let err = ScoreResult::failed(FailureKind::Timeout, "timed out");
        assert!(err.probability().is_none());
        assert_eq!(err.error(), Some("timed out"));
        assert_eq!(err.failure_kind(), Some(&FailureKind::Timeout));
    }

    #[test]
    fn test_wire_shapes() {
        let ok: ScoreResult = serde_json::from_str(r#"{"failure_probability":0.82}"#).unwrap();
        assert_eq!(ok.probability(), Some(0.82));

        let err: ScoreResult = serde_json::from_str(r#"{"error":"Model artifacts not loaded"}"#).unwrap();
        assert_eq!(err.error(), Some("Model artifacts not loaded"));

        let json = serde_json::to_value(ScoreResult::failed(FailureKind::HttpStatus(503), "down")).unwrap();
        assert_eq!(json["error"], "down");
        assert!(json.get("failure_probability").is_none());
    }

    #[test]
    fn test_exceeds_is_strict() {
        let at = ScoreResult::success(0.7).unwrap();
        assert!(!at.exceeds(0.7));
        assert!(ScoreResult::success(0.71).unwrap().exceeds(0.7));
        assert!(!ScoreResult::failed(FailureKind::Unreachable, "x").exceeds(0.0));
    }

    #[test]
    fn test_feature_vector_drops_non_finite() {
        let mut v = FeatureVector::new();
        assert!(v.insert("sensor_1", 10.0));
        assert!(!v.insert("sensor_2", f64::NAN));
        assert!(!v.insert("sensor_3", f64::INFINITY));
        assert_eq!(v.len(), 1);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"sensor_1":10.0}"#);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.82), "82.0%");
        assert_eq!(format_percent(0.0), "0.0%");
    }
}

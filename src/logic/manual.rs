//! Manual Submission - the hand-entered prediction form

use std::sync::Arc;
use thiserror::Error;

use crate::logic::alerts::{AlertStore, Severity};
use crate::logic::history::{HistoryStore, PredictionRecord, PredictionSource};
use crate::logic::scoring::{format_percent, FeatureVector, Scorer};
use crate::logic::storage::SettingsStore;

/// Fields the form always asks for
pub const REQUIRED_FEATURES: [&str; 3] = ["sensor_1", "sensor_2", "sensor_3"];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid input: {}", .problems.join(", "))]
    InvalidFields { problems: Vec<String> },
}

impl ValidationError {
    pub fn problems(&self) -> &[String] {
        match self {
            Self::InvalidFields { problems } => problems,
        }
    }
}

/// Check a vector against the form rules: required fields present, no negatives
pub fn validate(vector: &FeatureVector, required: &[String]) -> Result<(), ValidationError> {
    let mut problems = Vec::new();

    for name in required {
        if !vector.contains(name) {
            problems.push(format!("{} is required", name));
        }
    }
    for (name, value) in vector.iter() {
        if value < 0.0 {
            problems.push(format!("{} must be >= 0", name));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidFields { problems })
    }
}

/// Build a vector from raw `name=value` text fields
pub fn parse_fields<'a, I>(fields: I) -> Result<FeatureVector, ValidationError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut vector = FeatureVector::new();
    let mut problems = Vec::new();

    for (name, raw) in fields {
        let name = name.trim();
        match raw.trim().parse::<f64>() {
            Ok(value) if vector.insert(name, value) => {}
            _ => problems.push(format!("{} must be a number", name)),
        }
    }

    if problems.is_empty() {
        Ok(vector)
    } else {
        Err(ValidationError::InvalidFields { problems })
    }
}

pub struct ManualSubmitter<S: Scorer> {
    scorer: Arc<S>,
    history: Arc<HistoryStore>,
    alerts: Arc<AlertStore>,
    settings: SettingsStore,
    required: Vec<String>,
}

impl<S: Scorer> ManualSubmitter<S> {
    pub fn new(
        scorer: Arc<S>,
        history: Arc<HistoryStore>,
        alerts: Arc<AlertStore>,
        settings: SettingsStore,
    ) -> Self {
        Self {
            scorer,
            history,
            alerts,
            settings,
            required: REQUIRED_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = required;
        self
    }

    /// Validate, score, record, alert.
    ///
    /// Invalid input raises one error alert and never reaches the scorer.
    pub async fn submit(
        &self,
        vector: FeatureVector,
        request_id: Option<String>,
    ) -> Result<PredictionRecord, ValidationError> {
        if let Err(e) = validate(&vector, &self.required) {
            self.alerts.add(Severity::Error, e.to_string());
            return Err(e);
        }

        let threshold = self.settings.load().threshold_fraction();
        let result = self.scorer.score_tagged(&vector, request_id.as_deref()).await;

        match result.probability() {
            Some(p) if p > threshold => {
                self.alerts.add(
                    Severity::Warning,
                    format!("High failure probability detected: {}", format_percent(p)),
                );
            }
            Some(_) => {
                self.alerts.add(Severity::Success, "Prediction completed successfully.");
            }
            None => {
                log::warn!("Manual prediction failed: {}", result.error().unwrap_or_default());
                self.alerts.add(Severity::Error, "Prediction failed. Please try again.");
            }
        }

        let record = PredictionRecord::new(PredictionSource::Manual, vector, result)
            .with_request_id(request_id);
        self.history.append(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scoring::mock::MockScorer;
    use crate::logic::storage::LocalStore;

    struct Fixture {
        scorer: Arc<MockScorer>,
        history: Arc<HistoryStore>,
        alerts: Arc<AlertStore>,
        settings: SettingsStore,
    }

    fn fixture(scorer: MockScorer) -> Fixture {
        let storage = Arc::new(LocalStore::in_memory());
        Fixture {
            scorer: Arc::new(scorer),
            history: Arc::new(HistoryStore::load(storage.clone(), None)),
            alerts: Arc::new(AlertStore::with_ttl(None)),
            settings: SettingsStore::new(storage),
        }
    }

    fn submitter(f: &Fixture) -> ManualSubmitter<MockScorer> {
        ManualSubmitter::new(f.scorer.clone(), f.history.clone(), f.alerts.clone(), f.settings.clone())
    }

    fn reading(s1: f64, s2: f64, s3: f64) -> FeatureVector {
        [("sensor_1", s1), ("sensor_2", s2), ("sensor_3", s3)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_high_probability_raises_one_warning() {
        let f = fixture(MockScorer::probability(0.82));
        let record = submitter(&f).submit(reading(50.0, 80.0, 100.0), None).await.unwrap();

        assert_eq!(record.result.probability(), Some(0.82));
        let alerts = f.alerts.active();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert!(alerts[0].message.contains("82.0%"));
        assert_eq!(f.history.len(), 1);
    }

    #[tokio::test]
    async fn test_uses_configured_threshold() {
        let f = fixture(MockScorer::probability(0.6));
        f.settings.set_alert_threshold(50.0);
        submitter(&f).submit(reading(1.0, 2.0, 3.0), None).await.unwrap();
        assert_eq!(f.alerts.active()[0].severity, Severity::Warning);

        f.alerts.clear();
        f.settings.set_alert_threshold(60.0);
        submitter(&f).submit(reading(1.0, 2.0, 3.0), None).await.unwrap();
        assert_eq!(f.alerts.active()[0].severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_alerted() {
        let f = fixture(MockScorer::timeout());
        let record = submitter(&f)
            .submit(reading(1.0, 2.0, 3.0), Some("unit-9".to_string()))
            .await
            .unwrap();

        assert!(record.result.is_error());
        assert_eq!(record.request_id.as_deref(), Some("unit-9"));
        let alerts = f.alerts.active();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Error);
        assert_eq!(f.history.records()[0].source, PredictionSource::Manual);
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_sent() {
        let f = fixture(MockScorer::probability(0.1));
        let vector: FeatureVector = [("sensor_1", -1.0), ("sensor_3", 4.0)].into_iter().collect();

        let err = submitter(&f).submit(vector, None).await.unwrap_err();
        assert_eq!(
            err.problems(),
            &["sensor_2 is required".to_string(), "sensor_1 must be >= 0".to_string()]
        );
        assert_eq!(f.scorer.calls(), 0);
        assert!(f.history.is_empty());
        assert_eq!(f.alerts.active().len(), 1);
    }

    #[test]
    fn test_parse_fields() {
        let v = parse_fields([("sensor_1", " 12.5"), ("sensor_2", "3")]).unwrap();
        assert_eq!(v.get("sensor_1"), Some(12.5));

        let err = parse_fields([("sensor_1", "abc"), ("sensor_2", "NaN")]).unwrap_err();
        assert_eq!(err.problems().len(), 2);
    }
}

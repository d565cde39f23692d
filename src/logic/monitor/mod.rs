//! Real-Time Monitor - periodic synthetic scoring loop
//!
//! State machine:
//! - Idle -> Running: `start()`, refused with an info alert when auto-refresh
//!   is disabled in settings
//! - Running: every period, sample synthetic sensors, score them, record the
//!   result and warn above the alert threshold
//! - Running -> Idle: `stop()`, after which nothing from the stopped run is
//!   applied
//!
//! Monitoring always begins Idle; there is no recovery across restarts.

pub mod schedule;
pub mod synth;


pub use schedule::{Generation, PeriodicTask};
pub use synth::{SensorRange, SensorSynth};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::constants;
use crate::logic::alerts::{AlertStore, Severity};
use crate::logic::history::{HistoryStore, PredictionRecord, PredictionSource};
use crate::logic::scoring::{format_percent, FeatureVector, ScoreResult, Scorer};
use crate::logic::storage::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// Auto-refresh is disabled in settings
    Refused,
}

/// Latest synthesized reading and its probability (None when scoring failed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub vector: FeatureVector,
    pub probability: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

struct MonitorShared<S: Scorer> {
    scorer: Arc<S>,
    history: Arc<HistoryStore>,
    alerts: Arc<AlertStore>,
    settings: SettingsStore,
    synth: SensorSynth,
    generation: Arc<Generation>,
    snapshot: Mutex<Option<MonitorSnapshot>>,
}

impl<S: Scorer> MonitorShared<S> {
    async fn tick(&self, token: u64) {
        let settings = self.settings.load();
        if !settings.auto_refresh {
            log::debug!("Monitor tick skipped: auto-refresh disabled");
            return;
        }

        if !self.generation.is_current(token) {
            return;
        }

        let vector = self.synth.sample();
        log::debug!("Monitor tick {}: {:?}", token, vector);
        let result = self.scorer.score(&vector).await;

        let applied = self.generation.run_if_current(token, || {
            self.apply(vector, result, settings.threshold_fraction())
        });
        if applied.is_none() {
            log::debug!("Discarded result from stopped monitor run {}", token);
        }
    }

    fn apply(&self, vector: FeatureVector, result: ScoreResult, threshold: f64) {
        *self.snapshot.lock() = Some(MonitorSnapshot {
            vector: vector.clone(),
            probability: result.probability(),
            timestamp: Utc::now(),
        });

        match result.probability() {
            Some(p) => {
                self.history
                    .append(PredictionRecord::new(PredictionSource::Monitor, vector, result));
                if p > threshold {
                    self.alerts.add(
                        Severity::Warning,
                        format!("Real-time alert: High failure probability {}", format_percent(p)),
                    );
                }
            }
            None => {
                log::warn!("Real-time prediction failed: {}", result.error().unwrap_or_default());
                self.alerts.add(Severity::Error, "Real-time prediction failed.");
            }
        }
    }
}

pub struct RealTimeMonitor<S: Scorer> {
    shared: Arc<MonitorShared<S>>,
    task: Mutex<Option<PeriodicTask>>,
    period: Duration,
}

impl<S: Scorer> RealTimeMonitor<S> {
    pub fn new(
        scorer: Arc<S>,
        history: Arc<HistoryStore>,
        alerts: Arc<AlertStore>,
        settings: SettingsStore,
    ) -> Self {
        Self::with_synth(scorer, history, alerts, settings, SensorSynth::default())
    }

    /// Monitor drawing readings from custom sensor ranges
    pub fn with_synth(
        scorer: Arc<S>,
        history: Arc<HistoryStore>,
        alerts: Arc<AlertStore>,
        settings: SettingsStore,
        synth: SensorSynth,
    ) -> Self {
        Self {
            shared: Arc::new(MonitorShared {
                scorer,
                history,
                alerts,
                settings,
                synth,
                generation: Arc::new(Generation::new()),
                snapshot: Mutex::new(None),
            }),
            task: Mutex::new(None),
            period: constants::get_monitor_period(),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Begin monitoring. Must be called inside a Tokio runtime.
    pub fn start(&self) -> StartOutcome {
        let mut task = self.task.lock();
        if task.is_some() {
            return StartOutcome::AlreadyRunning;
        }

        if !self.shared.settings.load().auto_refresh {
            self.shared.alerts.add(Severity::Info, "Auto-refresh is disabled in settings.");
            return StartOutcome::Refused;
        }

        let shared = self.shared.clone();
        let spawned = PeriodicTask::spawn(self.period, self.shared.generation.clone(), move |token| {
            let shared = shared.clone();
            async move { shared.tick(token).await }
        });

        log::info!(
            "Real-time monitor started (generation {}, period {:?})",
            spawned.token(),
            self.period
        );
        *task = Some(spawned);
        StartOutcome::Started
    }

    /// Stop monitoring; returns false when already Idle
    pub fn stop(&self) -> bool {
        match self.task.lock().take() {
            Some(task) => {
                let token = task.token();
                task.cancel();
                log::info!("Real-time monitor stopped (generation {})", token);
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> MonitorState {
        if self.task.lock().is_some() {
            MonitorState::Running
        } else {
            MonitorState::Idle
        }
    }

    pub fn snapshot(&self) -> Option<MonitorSnapshot> {
        self.shared.snapshot.lock().clone()
    }
}

impl<S: Scorer> Drop for RealTimeMonitor<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel();
        }
    }
}

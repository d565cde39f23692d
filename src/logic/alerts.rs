//! Alert Store - session-scoped notifications
//!
//! Alerts are never persisted. They leave the store when dismissed, or softly
//! once older than the auto-hide period: expired alerts are hidden from
//! `active()` immediately and physically removed by `prune_expired()`.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ALERT_AUTO_HIDE_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

pub struct AlertStore {
    alerts: Mutex<Vec<Alert>>,
    ttl: Option<Duration>,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    /// Store with the standard auto-hide period
    pub fn new() -> Self {
        Self::with_ttl(Some(Duration::milliseconds(ALERT_AUTO_HIDE_MS as i64)))
    }

    /// `None` keeps alerts until dismissed
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            ttl,
        }
    }

    /// Queue an alert, dropping any that have already expired
    pub fn add(&self, severity: Severity, message: impl Into<String>) -> String {
        let now = Utc::now();
        self.prune_expired_at(now);

        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            severity,
            message: message.into(),
            timestamp: now,
        };

        match severity {
            Severity::Error => log::warn!("[ALERT] {}", alert.message),
            _ => log::info!("[ALERT] {}", alert.message),
        }

        let id = alert.id.clone();
        self.alerts.lock().push(alert);
        id
    }

    /// Dismiss one alert; false if it was already gone
    pub fn remove(&self, id: &str) -> bool {
        let mut alerts = self.alerts.lock();
        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        alerts.len() < before
    }

    pub fn clear(&self) {
        self.alerts.lock().clear();
    }

    /// Non-expired alerts, oldest first
    pub fn active(&self) -> Vec<Alert> {
        self.active_at(Utc::now())
    }

    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Alert> {
        self.alerts
            .lock()
            .iter()
            .filter(|a| !self.is_expired(a, now))
            .cloned()
            .collect()
    }

    /// Drop expired alerts; returns how many were removed
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Utc::now())
    }

    pub fn prune_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut alerts = self.alerts.lock();
        let before = alerts.len();
        alerts.retain(|a| !self.is_expired(a, now));
        before - alerts.len()
    }

    fn is_expired(&self, alert: &Alert, now: DateTime<Utc>) -> bool {
        self.ttl.map_or(false, |ttl| now - alert.timestamp >= ttl)
    }
}

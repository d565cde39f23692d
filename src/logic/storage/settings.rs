//! Settings - the one accessor for persisted dashboard configuration
//!
//! Fallbacks when nothing (or garbage) is stored:
//! - `apiBase`: `PM_API_BASE_URL`, else `http://localhost:5000`
//! - `darkTheme`: true
//! - `alertThreshold`: 70 (percent, clamped to 0..=100)
//! - `autoRefresh`: true

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::LocalStore;
use crate::constants;

pub const KEY_API_BASE: &str = "apiBase";
pub const KEY_DARK_THEME: &str = "darkTheme";
pub const KEY_ALERT_THRESHOLD: &str = "alertThreshold";
pub const KEY_AUTO_REFRESH: &str = "autoRefresh";

/// Dashboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub api_base: String,
    pub dark_theme: bool,
    /// Percent, 0..=100
    pub alert_threshold: f64,
    pub auto_refresh: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: constants::get_api_base(),
            dark_theme: true,
            alert_threshold: constants::DEFAULT_ALERT_THRESHOLD,
            auto_refresh: true,
        }
    }
}

impl Settings {
    /// Threshold as a fraction of 1.0, for comparing against probabilities
    pub fn threshold_fraction(&self) -> f64 {
        self.alert_threshold / 100.0
    }
}

/// Loads and saves `Settings` through a `LocalStore`
#[derive(Clone)]
pub struct SettingsStore {
    storage: Arc<LocalStore>,
}

impl SettingsStore {
    pub fn new(storage: Arc<LocalStore>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<LocalStore> {
        &self.storage
    }

    /// Read every setting fresh, applying per-key fallbacks
    pub fn load(&self) -> Settings {
        let defaults = Settings::default();

        let api_base: String = self.storage.get_setting(KEY_API_BASE, defaults.api_base.clone());
        let api_base = if api_base.trim().is_empty() { defaults.api_base } else { api_base };

        let threshold: f64 = self.storage.get_setting(KEY_ALERT_THRESHOLD, defaults.alert_threshold);
        let alert_threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 100.0)
        } else {
            defaults.alert_threshold
        };

        Settings {
            api_base,
            dark_theme: self.storage.get_setting(KEY_DARK_THEME, defaults.dark_theme),
            alert_threshold,
            auto_refresh: self.storage.get_setting(KEY_AUTO_REFRESH, defaults.auto_refresh),
        }
    }

    pub fn save(&self, settings: &Settings) {
        self.storage.set_setting(KEY_API_BASE, settings.api_base.as_str());
        self.storage.set_setting(KEY_DARK_THEME, &settings.dark_theme);
        self.storage.set_setting(KEY_ALERT_THRESHOLD, &settings.alert_threshold.clamp(0.0, 100.0));
        self.storage.set_setting(KEY_AUTO_REFRESH, &settings.auto_refresh);
        log::info!(
            "Settings saved: api={}, threshold={}%, auto_refresh={}",
            settings.api_base,
            settings.alert_threshold,
            settings.auto_refresh
        );
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        self.storage.set_setting(KEY_AUTO_REFRESH, &enabled);
    }

    pub fn set_alert_threshold(&self, percent: f64) {
        self.storage.set_setting(KEY_ALERT_THRESHOLD, &percent.clamp(0.0, 100.0));
    }
}

//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Runtime-editable values (api base, threshold, auto-refresh, theme) live in the
//! settings store; these are the fallbacks it uses when nothing is persisted.

use std::path::PathBuf;
use std::time::Duration;

/// Default scoring service URL
///
/// Used when neither the settings store nor `PM_API_BASE_URL` provides one.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000";

/// Prefix for every persisted key
pub const STORAGE_PREFIX: &str = "pm:";

/// File holding the persisted key/value map
pub const STORAGE_FILE_NAME: &str = "pm-storage.json";

/// Scoring request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Real-time monitor period (seconds)
pub const DEFAULT_MONITOR_PERIOD_SECS: u64 = 5;

/// Alert threshold, in percent
pub const DEFAULT_ALERT_THRESHOLD: f64 = 70.0;

/// Histogram bins per feature
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Alerts disappear from the banner after this long
pub const ALERT_AUTO_HIDE_MS: u64 = 6_000;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "PM Dashboard";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get scoring service URL from environment or use default
pub fn get_api_base() -> String {
    std::env::var("PM_API_BASE_URL")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

/// Get the data directory (persisted settings and history)
pub fn get_data_dir() -> PathBuf {
    std::env::var("PM_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pm-dashboard")
        })
}

/// Optional history cap; unset means unbounded
pub fn get_history_limit() -> Option<usize> {
    std::env::var("PM_HISTORY_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
}

/// Get monitor period from environment or use default
pub fn get_monitor_period() -> Duration {
    let secs = std::env::var("PM_MONITOR_PERIOD_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &u64| *n > 0)
        .unwrap_or(DEFAULT_MONITOR_PERIOD_SECS);
    Duration::from_secs(secs)
}

/// Get request timeout from environment or use default
pub fn get_request_timeout() -> Duration {
    let secs = std::env::var("PM_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &u64| *n > 0)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

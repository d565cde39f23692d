//! Dashboard Commands - API for the UI and the CLI
//!
//! `Dashboard` owns every store and component and wires them together by
//! explicit injection. Commands return `Result<T, String>` so a UI bridge can
//! forward errors as-is.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::constants;
use crate::logic::alerts::{Alert, AlertStore, Severity};
use crate::logic::batch::{BatchReport, BatchRunner};
use crate::logic::dataset::{self, FeatureSummary, HistogramBin, Row};
use crate::logic::history::{HistoryStore, PredictionRecord, TrendPoint};
use crate::logic::manual::{self, ManualSubmitter};
use crate::logic::monitor::{MonitorSnapshot, MonitorState, RealTimeMonitor, StartOutcome};
use crate::logic::scoring::{
    BackendStatus, FeatureVector, ModelInfo, Scorer, ScoringClient, ScoringConfig,
};
use crate::logic::storage::{LocalStore, Settings, SettingsStore};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Summaries for an upload plus the histogram of one selected feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureExploration {
    pub rows: usize,
    pub summaries: Vec<FeatureSummary>,
    pub selected: Option<String>,
    pub histogram: Vec<HistogramBin>,
}

/// Real-time panel state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub state: MonitorState,
    pub snapshot: Option<MonitorSnapshot>,
    pub trend: Vec<TrendPoint>,
}

/// Model status page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStatus {
    pub app: String,
    pub version: String,
    pub api_base: String,
    pub backend: BackendStatus,
    pub model: Option<ModelInfo>,
    pub history_count: usize,
    pub monitor: MonitorState,
}

/// Points shown on the probability-over-time chart
const TREND_POINTS: usize = 50;

// ============================================================================
// DASHBOARD
// ============================================================================

pub struct Dashboard<S: Scorer = ScoringClient> {
    client: Arc<ScoringClient>,
    scorer: Arc<S>,
    settings: SettingsStore,
    history: Arc<HistoryStore>,
    alerts: Arc<AlertStore>,
    manual: ManualSubmitter<S>,
    batch: BatchRunner<S>,
    monitor: RealTimeMonitor<S>,
}

impl Dashboard<ScoringClient> {
    /// Open the dashboard state persisted under `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, String> {
        Self::with_storage(Arc::new(LocalStore::open(data_dir)))
    }

    /// Open with the default data directory (`PM_DATA_DIR` or the local data dir)
    pub fn open_default() -> Result<Self, String> {
        Self::open(&constants::get_data_dir())
    }

    pub fn with_storage(storage: Arc<LocalStore>) -> Result<Self, String> {
        let client = Arc::new(build_client(&SettingsStore::new(storage.clone()))?);
        Ok(Self::assemble(client.clone(), client, storage))
    }
}

impl<S: Scorer> Dashboard<S> {
    /// Score through `scorer` instead of the HTTP client; health and model
    /// probes still use the configured api base
    pub fn with_scorer(scorer: Arc<S>, storage: Arc<LocalStore>) -> Result<Self, String> {
        let client = Arc::new(build_client(&SettingsStore::new(storage.clone()))?);
        Ok(Self::assemble(client, scorer, storage))
    }

    fn assemble(client: Arc<ScoringClient>, scorer: Arc<S>, storage: Arc<LocalStore>) -> Self {
        let settings = SettingsStore::new(storage.clone());
        let history = Arc::new(HistoryStore::load(storage, constants::get_history_limit()));
        let alerts = Arc::new(AlertStore::new());

        let manual = ManualSubmitter::new(scorer.clone(), history.clone(), alerts.clone(), settings.clone());
        let batch = BatchRunner::new(scorer.clone(), history.clone());
        let monitor = RealTimeMonitor::new(scorer.clone(), history.clone(), alerts.clone(), settings.clone());

        log::info!("{} v{} ready (api: {})", constants::APP_NAME, constants::APP_VERSION, client.api_base());

        Self {
            client,
            scorer,
            settings,
            history,
            alerts,
            manual,
            batch,
            monitor,
        }
    }

    pub fn scorer(&self) -> &Arc<S> {
        &self.scorer
    }

    // ========================================================================
    // PREDICTION COMMANDS
    // ========================================================================

    /// Score one hand-entered vector
    pub async fn submit_prediction(
        &self,
        features: FeatureVector,
        request_id: Option<String>,
    ) -> Result<PredictionRecord, String> {
        self.manual.submit(features, request_id).await.map_err(|e| e.to_string())
    }

    /// Score raw form fields (`name`, `text`)
    pub async fn submit_form(
        &self,
        fields: &[(String, String)],
        request_id: Option<String>,
    ) -> Result<PredictionRecord, String> {
        let vector = match manual::parse_fields(fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
            Ok(v) => v,
            Err(e) => {
                self.alerts.add(Severity::Error, e.to_string());
                return Err(e.to_string());
            }
        };
        self.submit_prediction(vector, request_id).await
    }

    // ========================================================================
    // BATCH & EXPLORER COMMANDS
    // ========================================================================

    pub async fn run_batch(&self, rows: &[Row]) -> BatchReport {
        let threshold = self.settings.load().threshold_fraction();
        self.batch.run_batch(rows, threshold).await
    }

    /// Parse and score a CSV file; unreadable or malformed files score no rows
    pub async fn run_batch_file(&self, path: &Path) -> BatchReport {
        let rows = dataset::read_rows(path);
        self.run_batch(&rows).await
    }

    /// Summaries for every numeric column, plus the histogram of `feature`
    /// (first summarized column when unset)
    pub fn explore_features(
        &self,
        rows: &[Row],
        feature: Option<&str>,
        bins: Option<usize>,
    ) -> FeatureExploration {
        let summaries = dataset::summarize(rows);
        let selected = feature
            .map(str::to_string)
            .or_else(|| summaries.first().map(|s| s.feature.clone()));
        let histogram = selected
            .as_deref()
            .map(|f| dataset::histogram(rows, f, bins.unwrap_or(constants::DEFAULT_HISTOGRAM_BINS)))
            .unwrap_or_default();

        FeatureExploration {
            rows: rows.len(),
            summaries,
            selected,
            histogram,
        }
    }

    pub fn explore_file(
        &self,
        path: &Path,
        feature: Option<&str>,
        bins: Option<usize>,
    ) -> FeatureExploration {
        let rows = dataset::read_rows(path);
        self.explore_features(&rows, feature, bins)
    }

    // ========================================================================
    // MONITOR COMMANDS
    // ========================================================================

    pub fn start_monitoring(&self) -> StartOutcome {
        self.monitor.start()
    }

    pub fn stop_monitoring(&self) -> bool {
        self.monitor.stop()
    }

    pub fn monitor_status(&self) -> MonitorStatus {
        MonitorStatus {
            state: self.monitor.state(),
            snapshot: self.monitor.snapshot(),
            trend: self.history.probability_trend(TREND_POINTS),
        }
    }

    // ========================================================================
    // HISTORY & ALERT COMMANDS
    // ========================================================================

    /// Newest first; `None` returns everything
    pub fn get_history(&self, limit: Option<usize>) -> Vec<PredictionRecord> {
        match limit {
            Some(n) => self.history.recent(n),
            None => self.history.records(),
        }
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    pub fn export_history_csv(&self) -> String {
        self.history.export_csv()
    }

    pub fn export_history_to(&self, path: &Path) -> Result<usize, String> {
        fs::write(path, self.history.export_csv()).map_err(|e| e.to_string())?;
        Ok(self.history.len())
    }

    pub fn get_alerts(&self) -> Vec<Alert> {
        self.alerts.prune_expired();
        self.alerts.active()
    }

    pub fn dismiss_alert(&self, id: &str) -> bool {
        self.alerts.remove(id)
    }

    pub fn clear_alerts(&self) {
        self.alerts.clear();
    }

    // ========================================================================
    // SETTINGS & STATUS COMMANDS
    // ========================================================================

    pub fn get_settings(&self) -> Settings {
        self.settings.load()
    }

    pub fn save_settings(&self, settings: &Settings) {
        self.settings.save(settings);
        self.client.set_api_base(&settings.api_base);
    }

    pub async fn backend_status(&self) -> BackendStatus {
        self.client.health().await
    }

    pub async fn model_info(&self) -> Option<ModelInfo> {
        self.client.model_info().await
    }

    pub async fn get_status(&self) -> DashboardStatus {
        let backend = self.backend_status().await;
        let model = match backend {
            BackendStatus::Online => self.model_info().await,
            _ => None,
        };

        DashboardStatus {
            app: constants::APP_NAME.to_string(),
            version: constants::APP_VERSION.to_string(),
            api_base: self.client.api_base(),
            backend,
            model,
            history_count: self.history.len(),
            monitor: self.monitor.state(),
        }
    }
}

fn build_client(settings: &SettingsStore) -> Result<ScoringClient, String> {
    let config = ScoringConfig {
        api_base: settings.load().api_base,
        ..ScoringConfig::default()
    };
    ScoringClient::new(config).map_err(|e| e.to_string())
}

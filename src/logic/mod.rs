//! Logic Module - Scoring pipeline, stores and engines
//!
//! Leaves first:
//! - `scoring/` - FeatureVector, ScoreResult, HTTP scoring client
//! - `dataset/` - CSV ingestion, feature summaries, histograms
//! - `storage/` - namespaced local key-value store and settings
//! - `history`, `alerts` - shared state every producer writes to
//! - `manual`, `batch`, `monitor/` - the three producers

pub mod scoring;
pub mod dataset;
pub mod storage;

pub mod history;
pub mod alerts;

pub mod manual;
pub mod batch;
pub mod monitor;

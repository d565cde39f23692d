//! PM Dashboard Core
//!
//! Client-side analytics and alerting pipeline for the predictive-maintenance
//! dashboard. The UI (and the `pm-core` binary) talk to it through
//! `api::commands::Dashboard`.

pub mod api;
pub mod constants;
pub mod logic;

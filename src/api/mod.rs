//! API Module
//!
//! Structure:
//! - commands.rs: the `Dashboard` facade the UI and CLI call into

pub mod commands;

pub use commands::*;

//! `assessor-worker` library crate.
//!
//! Composition root for batch assessment runs: configuration, file I/O,
//! the analysis pipeline and its JSON report. The binary entrypoint lives
//! in `main.rs`; the modules are exposed here for integration testing.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;

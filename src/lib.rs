//! Library exports for the binaries, benchmarks and tests.
/// Per-user application directories.
pub mod app_dirs;
/// Persisted artifact bundle.
pub mod artifacts;
/// `croprec.toml` settings.
pub mod config;
/// Labeled dataset loading and splitting.
pub mod dataset;
/// Tracing setup and log file rotation.
pub mod logging;
/// Scalers, label encoder, random forest and metrics.
pub mod ml;
/// Inference pipeline and output decoding.
pub mod pipeline;
/// Feature column schema shared by every flow.
pub mod schema;
/// Shared serving context.
pub mod serving;
/// Offline training flow.
pub mod training;
/// Desktop UI.
pub mod ui;

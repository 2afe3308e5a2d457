//! Prometheus exporter for iKnow learning statistics
//!
//! Periodically fetches the cumulative learning-engine statistics and the
//! per-goal aggregate statistics of one iKnow account and exposes them as
//! gauges on an HTTP `/metrics` endpoint.

pub mod api;
pub mod app;
pub mod client;
pub mod cmd;
pub mod config;
pub mod exporter;
pub mod metrics;
pub mod scheduler;

pub use client::IknowClient;
pub use exporter::Exporter;
pub use exporter::UpdateReport;
pub use exporter::UpdateStatus;
pub use metrics::IknowMetrics;
pub use scheduler::Scheduler;

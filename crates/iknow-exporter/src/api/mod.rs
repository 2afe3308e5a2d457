//! HTTP endpoint serving the exporter's gauges
//!
//! # API Endpoints
//!
//! - `GET /metrics` - all currently set series in the Prometheus text format
//!
//! The endpoint is unauthenticated; the bearer credential is only ever used
//! towards the upstream API.

use core::error::Error;

pub mod handlers;
pub mod server;

pub use server::routes;
pub use server::MetricsServer;

/// API errors
#[derive(Debug, derive_more::Display)]
pub enum ApiError {
    #[display("Failed to bind listen address {addr}")]
    Bind { addr: String },
    #[display("Server error: {message}")]
    ServerError { message: String },
}

impl Error for ApiError {}

//! Observability Module - Tracing and Prometheus metrics
//!
//! - `tracing`: subscriber setup from the configured log level
//! - `metrics`: processor counters and handler latency
//! - `http`: `/metrics` exposition over axum

pub mod http;
pub mod metrics;
pub mod tracing;

pub use http::{metrics_router, serve_metrics};
pub use metrics::ProcessorMetrics;
pub use tracing::{TracingConfig, TracingResult, init_tracing};

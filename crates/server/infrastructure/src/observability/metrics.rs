//! Metrics Module - Prometheus metrics for the command processor
//!
//! - commands received and handled, by command type
//! - messages dropped before reaching a handler, by reason
//! - events published, by event type, and publish failures
//! - handler latency

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Custom Histogram buckets for handler latency
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

const NAMESPACE: &str = "todo_processor";

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";

/// Processor metrics
#[derive(Debug, Clone)]
pub struct ProcessorMetrics {
    /// Commands received, by command type
    pub commands_received: IntCounterVec,

    /// Commands handled, by command type and outcome
    pub commands_handled: IntCounterVec,

    /// Messages acknowledged without reaching a handler
    pub messages_dropped: IntCounterVec,

    /// Events acknowledged by the broker, by event type
    pub events_published: IntCounterVec,

    /// Publish calls that failed
    pub publish_errors: IntCounter,

    /// Handler latency, by command type
    pub handler_duration: HistogramVec,

    registry: Arc<Registry>,
}

impl ProcessorMetrics {
    /// Creates the metrics on a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let commands_received = IntCounterVec::new(
            Opts::new("commands_received_total", "Commands received by type").namespace(NAMESPACE),
            &["command_type"],
        )?;

        let commands_handled = IntCounterVec::new(
            Opts::new("commands_handled_total", "Commands handled by type and outcome")
                .namespace(NAMESPACE),
            &["command_type", "outcome"],
        )?;

        let messages_dropped = IntCounterVec::new(
            Opts::new(
                "messages_dropped_total",
                "Messages acknowledged without being handled",
            )
            .namespace(NAMESPACE),
            &["reason"],
        )?;

        let events_published = IntCounterVec::new(
            Opts::new("events_published_total", "Events published by type").namespace(NAMESPACE),
            &["event_type"],
        )?;

        let publish_errors = IntCounter::with_opts(
            Opts::new("publish_errors_total", "Failed event publishes").namespace(NAMESPACE),
        )?;

        let handler_duration = HistogramVec::new(
            HistogramOpts::new("handler_duration_seconds", "Command handler latency")
                .namespace(NAMESPACE)
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["command_type"],
        )?;

        registry.register(Box::new(commands_received.clone()))?;
        registry.register(Box::new(commands_handled.clone()))?;
        registry.register(Box::new(messages_dropped.clone()))?;
        registry.register(Box::new(events_published.clone()))?;
        registry.register(Box::new(publish_errors.clone()))?;
        registry.register(Box::new(handler_duration.clone()))?;

        Ok(Self {
            commands_received,
            commands_handled,
            messages_dropped,
            events_published,
            publish_errors,
            handler_duration,
            registry: Arc::new(registry),
        })
    }

    pub fn record_received(&self, command_type: &str) {
        self.commands_received
            .with_label_values(&[command_type])
            .inc();
    }

    pub fn record_handled(&self, command_type: &str, outcome: &str, elapsed: Duration) {
        self.commands_handled
            .with_label_values(&[command_type, outcome])
            .inc();
        self.handler_duration
            .with_label_values(&[command_type])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_dropped(&self, reason: &str) {
        self.messages_dropped.with_label_values(&[reason]).inc();
    }

    pub fn record_published(&self, event_type: &str) {
        self.events_published.with_label_values(&[event_type]).inc();
    }

    pub fn record_publish_error(&self) {
        self.publish_errors.inc();
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Gather all metrics in text exposition format
    pub fn gather(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

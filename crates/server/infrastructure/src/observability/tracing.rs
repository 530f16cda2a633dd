//! Tracing Module - structured logging setup
//!
//! `RUST_LOG`, when set and valid, wins over the configured level so a
//! single module can be turned up without touching deployment config.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;

const FALLBACK_LEVEL: &str = "info";

/// Configuration for tracing
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name logged at startup
    pub service_name: String,
    /// Log level or filter directive
    pub log_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "domain-processor".to_string(),
            log_level: FALLBACK_LEVEL.to_string(),
        }
    }
}

/// Result of tracing initialization
#[derive(Debug, Default)]
pub struct TracingResult {
    pub initialized: bool,
    pub errors: Vec<String>,
}

/// Builds the filter: a valid `rust_log` first, then `level`, then `info`.
pub fn env_filter_for(level: &str, rust_log: Option<&str>, errors: &mut Vec<String>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return filter,
            Err(e) => errors.push(format!("invalid RUST_LOG '{}': {}", directives, e)),
        }
    }

    EnvFilter::try_new(level).unwrap_or_else(|e| {
        errors.push(format!("invalid log level '{}': {}", level, e));
        EnvFilter::new(FALLBACK_LEVEL)
    })
}

/// Initialize the global subscriber
pub fn init_tracing(config: &TracingConfig) -> TracingResult {
    let mut result = TracingResult::default();

    let rust_log = std::env::var("RUST_LOG").ok();
    let env_filter = env_filter_for(&config.log_level, rust_log.as_deref(), &mut result.errors);

    let logging_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout)
        .with_filter(env_filter);

    let subscriber = tracing_subscriber::Registry::default().with(logging_layer);
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => {
            result.initialized = true;
            info!(service = %config.service_name, "Tracing initialized");
        }
        Err(e) => result.errors.push(e.to_string()),
    }

    result
}

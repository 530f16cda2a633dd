//! Configuration module for the todo domain processor
//!
//! Configuration is loaded once at startup, validated, and handed to the
//! components that need it. Errors are reported immediately; there are no
//! silent fallbacks for values that are present but malformed.
//!
//! # Usage
//!
//! ```ignore
//! use todoflow_shared::config::ConfigLoader;
//!
//! let config = ConfigLoader::new(None).load_processor_config()?;
//! println!("Consuming from {:?}", config.nats.urls);
//! ```
//!
//! # Environment Variables
//!
//! ## Required Variables
//!
//! - `NATS_URL`: NATS connection URL (comma-separated for clustering)
//! - `DATABASE_URL`: PostgreSQL connection string
//!
//! ## Optional Variables
//!
//! - `LOG_LEVEL`: Log level or filter directive (default: "info")
//! - `METRICS_ADDR`: Prometheus listen address (default: ":9091")
//! - `DB_POOL_SIZE`: Database pool size (default: 10)
//! - `DB_CONNECT_TIMEOUT_SECS`: Pool acquire timeout (default: 30)
//! - `NATS_CONNECT_TIMEOUT_SECS`: NATS connection timeout (default: 10)
//! - `ACK_WAIT_SECS`: Command consumer ack deadline (default: 30)

pub mod dto;
pub mod error;
pub mod loader;
pub mod validator;

pub use dto::{
    ConfigOverrides, DatabaseConfig, LoggingConfig, MetricsConfig, NatsConfig, ProcessorConfigDto,
};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, parse_listen_addr};
pub use validator::{
    validate_database_url, validate_log_level, validate_nats_urls, validate_pool_config,
    validate_processor_config,
};

//! Configuration error types
//!
//! All errors that can occur while loading and validating processor configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading or validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration variable is missing
    #[error("Missing required configuration: {var}")]
    MissingRequired { var: String },

    /// A configuration variable has an invalid value
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    /// Failed to load .env file
    #[error("Failed to load .env file from {path}: {source}")]
    EnvFileLoad {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),

    /// Invalid socket address format
    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    /// Invalid database URL format
    #[error("Invalid database URL format: {0}")]
    InvalidDatabaseUrl(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

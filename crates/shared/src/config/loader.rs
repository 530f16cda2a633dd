//! Configuration loader
//!
//! This module provides the ConfigLoader which is responsible for loading
//! configuration from an optional .env file, environment variables and
//! command-line overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::dto::{
    ConfigOverrides, DatabaseConfig, LoggingConfig, MetricsConfig, NatsConfig, ProcessorConfigDto,
};
use super::error::{ConfigError, Result};
use super::validator::validate_processor_config;

pub const NATS_URL_VAR: &str = "NATS_URL";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
pub const METRICS_ADDR_VAR: &str = "METRICS_ADDR";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_METRICS_ADDR: &str = ":9091";

/// Configuration loader
///
/// Sources, highest priority first:
/// 1. Overrides (command-line flags)
/// 2. Environment variables
/// 3. .env file (only fills variables not already set)
///
/// # Example
///
/// ```ignore
/// use todoflow_shared::config::{ConfigLoader, ConfigOverrides};
/// use std::path::PathBuf;
///
/// let loader = ConfigLoader::new(Some(PathBuf::from(".env"))).with_overrides(ConfigOverrides {
///     log_level: Some("debug".to_string()),
///     ..Default::default()
/// });
/// let config = loader.load_processor_config()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Optional path to .env file
    env_file_path: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    /// Create a new ConfigLoader
    ///
    /// ```
    /// use todoflow_shared::config::ConfigLoader;
    ///
    /// // Without .env file
    /// let loader = ConfigLoader::new(None);
    ///
    /// // With .env file
    /// let loader = ConfigLoader::new(Some(".env".into()));
    /// ```
    pub fn new(env_file_path: Option<PathBuf>) -> Self {
        Self {
            env_file_path,
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load and validate the processor configuration
    ///
    /// Fails with `ConfigError::MissingRequired` when `NATS_URL` or
    /// `DATABASE_URL` is set nowhere.
    pub fn load_processor_config(&self) -> Result<ProcessorConfigDto> {
        if let Some(path) = &self.env_file_path {
            self.load_env_file(path)?;
        }

        let config = ProcessorConfigDto::from_lookup(|var| self.lookup(var))?;

        validate_processor_config(&config)?;

        Ok(config)
    }

    fn lookup(&self, var: &str) -> Option<String> {
        self.overrides
            .get(var)
            .or_else(|| std::env::var(var).ok())
    }

    fn load_env_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ConfigError::EnvFileLoad {
                path: path.to_path_buf(),
                source: dotenv::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                )),
            });
        }

        dotenv::from_path(path).map_err(|e| ConfigError::EnvFileLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }
}

impl ConfigOverrides {
    /// Override value for an environment variable name, if one was given.
    pub fn get(&self, var: &str) -> Option<String> {
        let value = match var {
            NATS_URL_VAR => &self.nats_url,
            DATABASE_URL_VAR => &self.database_url,
            LOG_LEVEL_VAR => &self.log_level,
            METRICS_ADDR_VAR => &self.metrics_addr,
            _ => return None,
        };
        value.clone().filter(|v| !v.is_empty())
    }
}

// ============================================================================
// Implementation: ProcessorConfigDto::from_lookup
// ============================================================================

impl ProcessorConfigDto {
    /// Build the configuration from a variable lookup
    ///
    /// The lookup is usually the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            nats: NatsConfig::from_lookup(&lookup)?,
            database: DatabaseConfig::from_lookup(&lookup)?,
            logging: LoggingConfig::from_lookup(&lookup),
            metrics: MetricsConfig::from_lookup(&lookup)?,
        })
    }
}

impl NatsConfig {
    /// # Variables
    ///
    /// - `NATS_URL` (required): comma-separated for clustering
    /// - `NATS_CONNECT_TIMEOUT_SECS`: default 10
    /// - `ACK_WAIT_SECS`: default 30
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let urls_str = required_var(lookup, NATS_URL_VAR)?;

        let urls: Vec<String> = urls_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if urls.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: NATS_URL_VAR.to_string(),
                value: urls_str,
            });
        }

        Ok(Self {
            urls,
            connect_timeout_secs: parse_optional_var(lookup, "NATS_CONNECT_TIMEOUT_SECS", 10)?,
            ack_wait_secs: parse_optional_var(lookup, "ACK_WAIT_SECS", 30)?,
        })
    }
}

impl DatabaseConfig {
    /// # Variables
    ///
    /// - `DATABASE_URL` (required)
    /// - `DB_POOL_SIZE`: default 10
    /// - `DB_CONNECT_TIMEOUT_SECS`: default 30
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            url: required_var(lookup, DATABASE_URL_VAR)?,
            pool_size: parse_optional_var(lookup, "DB_POOL_SIZE", 10)?,
            connect_timeout_secs: parse_optional_var(lookup, "DB_CONNECT_TIMEOUT_SECS", 30)?,
        })
    }
}

impl LoggingConfig {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            level: non_empty(lookup, LOG_LEVEL_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

impl MetricsConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = non_empty(lookup, METRICS_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string());

        Ok(Self {
            listen_addr: parse_listen_addr(&raw)?,
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a listen address, accepting the port-only form `:9091` for all interfaces.
pub fn parse_listen_addr(raw: &str) -> Result<SocketAddr> {
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{}", raw)
    } else {
        raw.to_string()
    };

    candidate
        .parse()
        .map_err(|_| ConfigError::InvalidSocketAddr(raw.to_string()))
}

fn non_empty<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_var<F>(lookup: &F, var: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, var).ok_or_else(|| ConfigError::MissingRequired {
        var: var.to_string(),
    })
}

/// Parse optional variable with default value; a present but unparsable value is an error.
fn parse_optional_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_empty(lookup, var) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
    }
}

// ============================================================================
// Tests
// ============================================================================

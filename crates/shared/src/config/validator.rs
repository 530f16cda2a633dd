//! Configuration validation
//!
//! Checks run once after loading, before any connection is attempted.

use super::dto::ProcessorConfigDto;
use super::error::{ConfigError, Result};
use std::net::SocketAddr;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate a database URL format
///
/// Accepts `postgres://` and `postgresql://` URLs. The port is optional and
/// defaults to 5432; when present it must be numeric.
pub fn validate_database_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(ConfigError::InvalidDatabaseUrl(
            "Database URL cannot be empty".to_string(),
        ));
    }

    let Some(rest) = url
        .strip_prefix("postgres://")
        .or_else(|| url.strip_prefix("postgresql://"))
    else {
        return Err(ConfigError::InvalidDatabaseUrl(format!(
            "Database URL must start with postgres:// or postgresql://, got: {}",
            url
        )));
    };

    // Drop credentials, keep host:port/db
    let host_part = rest.rsplit_once('@').map_or(rest, |(_, host)| host);

    if host_part.starts_with('/') {
        return Ok(());
    }

    let authority = host_part.split(['/', '?']).next().unwrap_or_default();
    if let Some(port) = explicit_port(authority).filter(|p| p.parse::<u16>().is_err()) {
        return Err(ConfigError::InvalidDatabaseUrl(format!(
            "Invalid port in database URL: {}",
            port
        )));
    }

    Ok(())
}

/// Port text after the last `:` of `host[:port]`, ignoring IPv6 brackets
fn explicit_port(authority: &str) -> Option<&str> {
    let (host, port) = authority.rsplit_once(':')?;
    if host.starts_with('[') && !host.ends_with(']') {
        return None;
    }
    Some(port)
}

/// Validate NATS URLs
pub fn validate_nats_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        return Err(ConfigError::Validation(
            "NATS URLs cannot be empty".to_string(),
        ));
    }

    for url in urls {
        if url.is_empty() {
            return Err(ConfigError::Validation(
                "NATS URL cannot be empty".to_string(),
            ));
        }

        let Some(without_scheme) = url
            .strip_prefix("nats://")
            .or_else(|| url.strip_prefix("tls://"))
        else {
            return Err(ConfigError::Validation(format!(
                "NATS URL must start with nats:// or tls://, got: {}",
                url
            )));
        };

        // Port defaults to 4222 when omitted
        let authority = without_scheme.rsplit_once('@').map_or(without_scheme, |(_, h)| h);
        let authority = authority.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            return Err(ConfigError::Validation(format!(
                "NATS URL must include a host, got: {}",
                url
            )));
        }
        if explicit_port(authority).is_some_and(|p| p.parse::<u16>().is_err()) {
            return Err(ConfigError::Validation(format!(
                "Invalid port in NATS URL: {}",
                url
            )));
        }
    }

    Ok(())
}

/// Validate database pool configuration
pub fn validate_pool_config(pool_size: u32) -> Result<()> {
    if pool_size == 0 {
        return Err(ConfigError::Validation(
            "Database pool size must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate the log level
///
/// A bare level must be one of the known names. Anything containing `=` or `,`
/// is treated as a filter directive and left to the subscriber to parse.
pub fn validate_log_level(level: &str) -> Result<()> {
    if level.trim().is_empty() {
        return Err(ConfigError::Validation(
            "Log level cannot be empty".to_string(),
        ));
    }

    if level.contains('=') || level.contains(',') {
        return Ok(());
    }

    if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::InvalidValue {
            var: "LOG_LEVEL".to_string(),
            value: level.to_string(),
        });
    }

    Ok(())
}

/// Validate the metrics listen address
pub fn validate_metrics_addr(addr: &SocketAddr) -> Result<()> {
    if addr.port() == 0 {
        return Err(ConfigError::Validation(
            "Metrics address port cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate the ack deadline of the command consumer
pub fn validate_ack_wait(ack_wait_secs: u64) -> Result<()> {
    if ack_wait_secs == 0 {
        return Err(ConfigError::Validation(
            "Ack wait must be at least one second".to_string(),
        ));
    }

    Ok(())
}

/// Validate the complete processor configuration
pub fn validate_processor_config(config: &ProcessorConfigDto) -> Result<()> {
    validate_database_url(&config.database.url)?;
    validate_pool_config(config.database.pool_size)?;
    validate_nats_urls(&config.nats.urls)?;
    validate_ack_wait(config.nats.ack_wait_secs)?;
    validate_log_level(&config.logging.level)?;
    validate_metrics_addr(&config.metrics.listen_addr)?;

    Ok(())
}

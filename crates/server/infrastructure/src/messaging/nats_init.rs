//! # NATS JetStream Initialization
//!
//! Ensures the command and event streams exist before the subscriber starts.
//! Streams are created idempotently; an existing stream is left untouched.

use async_nats::jetstream;
use async_nats::jetstream::stream::{Config as StreamConfig, StorageType};
use todoflow_shared::{
    COMMANDS_STREAM_NAME, COMMANDS_SUBJECT, EVENTS_STREAM_NAME, EVENTS_SUBJECT,
};
use tracing::{debug, error, info};

/// NATS stream configuration for automatic initialization
#[derive(Debug, Clone)]
pub struct NatsStreamConfig {
    pub name: &'static str,
    /// Subject patterns to bind to this stream
    pub subjects: Vec<&'static str>,
    pub description: &'static str,
    pub storage: StorageType,
}

impl NatsStreamConfig {
    pub fn to_stream_config(&self) -> StreamConfig {
        StreamConfig {
            name: self.name.to_string(),
            subjects: self.subjects.iter().map(|s| s.to_string()).collect(),
            description: Some(self.description.to_string()),
            storage: self.storage,
            ..Default::default()
        }
    }
}

/// Streams the processor reads from and writes to
pub fn required_streams() -> Vec<NatsStreamConfig> {
    vec![
        NatsStreamConfig {
            name: COMMANDS_STREAM_NAME,
            subjects: vec![COMMANDS_SUBJECT],
            description: "Inbound todo commands",
            storage: StorageType::File,
        },
        NatsStreamConfig {
            name: EVENTS_STREAM_NAME,
            subjects: vec![EVENTS_SUBJECT],
            description: "Outbound todo events",
            storage: StorageType::File,
        },
    ]
}

/// Initialize all required NATS JetStream streams
///
/// # Errors
/// Returns an error if any stream cannot be created or verified
pub async fn initialize_nats_streams(jetstream: &jetstream::Context) -> Result<(), anyhow::Error> {
    let mut all_ok = true;

    for stream_config in required_streams() {
        match ensure_stream(jetstream, &stream_config).await {
            Ok(true) => {
                info!(stream = stream_config.name, "Stream created");
            }
            Ok(false) => {
                debug!(stream = stream_config.name, "Stream already exists");
            }
            Err(e) => {
                error!(
                    stream = stream_config.name,
                    error = %e,
                    "Failed to create/verify stream"
                );
                all_ok = false;
            }
        }
    }

    if !all_ok {
        return Err(anyhow::anyhow!(
            "Failed to initialize one or more NATS streams"
        ));
    }

    Ok(())
}

/// Ensure a stream exists, creating it if necessary
///
/// Returns `Ok(true)` if stream was created, `Ok(false)` if it already existed
async fn ensure_stream(
    jetstream: &jetstream::Context,
    config: &NatsStreamConfig,
) -> Result<bool, anyhow::Error> {
    if jetstream.get_stream(config.name).await.is_ok() {
        return Ok(false);
    }

    match jetstream.create_stream(config.to_stream_config()).await {
        Ok(_) => Ok(true),
        // Lost a creation race with another instance
        Err(e) if jetstream.get_stream(config.name).await.is_ok() => {
            debug!(stream = config.name, error = %e, "Stream created concurrently");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

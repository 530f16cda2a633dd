//! NATS JetStream connection and event publisher.
//!
//! Events are published with a JetStream ack request; `publish` returns only
//! once the broker has stored the message.

use async_nats::jetstream::Context as JetStreamContext;
use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use todo_processor_domain::event_bus::{EventPublisher, PublishError};
use todoflow_shared::TodoEvent;
use todoflow_shared::config::NatsConfig;
use tracing::{debug, info, instrument};

use crate::observability::ProcessorMetrics;

/// Client connection name reported to the server
pub const CLIENT_NAME: &str = "domain-processor";

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Consumer error: {0}")]
    Consumer(String),
}

/// Connects to the configured NATS servers.
///
/// All URLs are handed to the client, which picks one and fails over to the
/// others on reconnect.
pub async fn connect(config: &NatsConfig) -> Result<Client, MessagingError> {
    let connect_options = ConnectOptions::new()
        .name(CLIENT_NAME)
        .connection_timeout(config.connect_timeout());

    let client = async_nats::connect_with_options(config.urls.join(","), connect_options)
        .await
        .map_err(|e| MessagingError::Connection(e.to_string()))?;

    info!(urls = ?config.urls, "Connected to NATS");
    Ok(client)
}

/// JetStream-backed [`EventPublisher`]
#[derive(Clone)]
pub struct NatsEventPublisher {
    jetstream: JetStreamContext,
    metrics: Option<Arc<ProcessorMetrics>>,
}

impl NatsEventPublisher {
    pub fn new(jetstream: JetStreamContext) -> Self {
        Self {
            jetstream,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ProcessorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn send(&self, subject: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let ack = self
            .jetstream
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        // Wait for ack (confirms message was stored)
        ack.await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Encodes an event as published on the wire
pub fn encode_event(event: &TodoEvent) -> Result<Vec<u8>, PublishError> {
    serde_json::to_vec(event).map_err(|e| PublishError::Serialization(e.to_string()))
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    #[instrument(skip(self, event), fields(event_type = %event.event_type(), id = %event.id()))]
    async fn publish(&self, subject: &str, event: &TodoEvent) -> Result<(), PublishError> {
        let result = match encode_event(event) {
            Ok(payload) => self.send(subject, payload).await,
            Err(e) => Err(e),
        };

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(()) => metrics.record_published(event.event_type().as_str()),
                Err(_) => metrics.record_publish_error(),
            }
        }

        if result.is_ok() {
            debug!(subject, "Published event");
        }
        result
    }
}

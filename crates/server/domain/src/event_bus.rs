use async_trait::async_trait;
use thiserror::Error;
use todoflow_shared::TodoEvent;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Failed to publish event: {0}")]
    Transport(String),
}

/// Outbound side of the processor: one call, one event, one broker ack.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Serializes `event` and publishes it on `subject`, waiting for the broker
    /// to acknowledge. No retries, no buffering.
    async fn publish(&self, subject: &str, event: &TodoEvent) -> Result<(), PublishError>;
}

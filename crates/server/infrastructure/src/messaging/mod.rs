//! Messaging Infrastructure
//!
//! NATS JetStream adapters:
//! - connection setup and the outbound event publisher
//! - idempotent stream provisioning at startup
//! - the durable command subscriber that feeds the processor

pub mod command_consumer;
pub mod nats;
pub mod nats_init;

pub use command_consumer::{
    CommandSubscriber, CommandSubscriberConfig, DispatchOutcome, dispatch,
};
pub use nats::{MessagingError, NatsEventPublisher, connect};
pub use nats_init::{NatsStreamConfig, initialize_nats_streams, required_streams};

//! Centralized subject and stream names for NATS JetStream
//!
//! Single source of truth for the subjects this service consumes from and
//! publishes to, so that producers, consumers and stream provisioning never
//! drift apart.
//!
//! ## Usage
//! ```rust
//! use todoflow_shared::topics::{COMMANDS_SUBJECT, EVENTS_SUBJECT};
//!
//! assert_eq!(COMMANDS_SUBJECT, "todo.commands");
//! assert_eq!(EVENTS_SUBJECT, "todo.events");
//! ```

/// Subject carrying inbound todo commands
pub const COMMANDS_SUBJECT: &str = "todo.commands";

/// Subject carrying outbound todo events
pub const EVENTS_SUBJECT: &str = "todo.events";

/// Stream bound to [`COMMANDS_SUBJECT`]
pub const COMMANDS_STREAM_NAME: &str = "todo_commands";

/// Stream bound to [`EVENTS_SUBJECT`]
pub const EVENTS_STREAM_NAME: &str = "todo_events";

/// Durable consumer name; its cursor survives restarts
pub const DURABLE_CONSUMER_NAME: &str = "domain-processor";

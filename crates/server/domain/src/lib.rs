// Todo Domain Processor - Domain Layer
// - persistence: capability port over the relational store
// - event_bus: outbound event publishing port
// - command: command handling (processor, statements, errors)
// - testing: in-memory doubles for the ports

pub mod command;
pub mod event_bus;
pub mod persistence;
pub mod testing;

pub use command::*;
pub use event_bus::*;
pub use persistence::*;

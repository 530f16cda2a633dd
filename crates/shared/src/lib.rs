pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod topics;

pub use commands::*;
pub use error::*;
pub use events::*;
pub use topics::*;

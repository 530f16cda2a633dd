//! Persistence adapters
//!
//! PostgreSQL implementation of the processor's database capability.

pub mod postgres;

pub use postgres::{DatabasePool, DatabasePoolConfig, PgExecutor, PoolError};

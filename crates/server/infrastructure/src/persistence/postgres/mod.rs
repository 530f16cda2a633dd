pub mod executor;
pub mod pool;

pub use executor::PgExecutor;
pub use pool::{DatabasePool, DatabasePoolConfig, PoolError};

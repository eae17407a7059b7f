//! Connection pooling for the backing store
//!
//! A bounded pool with configurable size and timeouts. Connections are
//! checked out through scoped guards and returned on drop; a checkout that
//! cannot be satisfied within the acquire timeout fails instead of queuing
//! unboundedly.
//!
//! # Example
//!
//! ```ignore
//! use pulse_datastore::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(10)
//!     .with_acquire_timeout_ms(5000)
//!     .with_idle_timeout_ms(300000);
//!
//! let pool = ConnectionPool::new(config, connection_factory);
//! let conn = pool.acquire().await?;
//! // Use connection...
//! // Connection returned to pool on drop
//! ```

mod config;
mod metrics;
mod pool;


pub use config::PoolConfig;
pub use metrics::PoolMetrics;
pub use pool::{ConnectionFactory, ConnectionPool, PooledConnection};

//! Pulse Datastore - pooled persistence layer for the analytics backend
//!
//! Two interchangeable manager variants behind one handle:
//! [`ConnectionManager`] drives queries and transactions over a bounded
//! PostgreSQL connection pool; [`StandInManager`] serves deployments that
//! deliberately run without persistence. [`Datastore::from_config`] performs
//! the one-time selection between them; dependents receive the handle by
//! injection and never learn which variant is active.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pulse_datastore::{Datastore, DatastoreConfig};
//!
//! let config = DatastoreConfig::from_env()?;
//! let store = Arc::new(Datastore::from_config(&config));
//!
//! let result = store.query("SELECT id, revenue FROM campaigns", &[]).await?;
//! tracing::info!(rows = result.row_count(), "loaded campaigns");
//! ```

mod client;
mod manager;
pub mod pool;
pub mod postgres;
mod standin;
mod store;

pub use client::DatastoreClient;
pub use manager::ConnectionManager;
pub use pool::{ConnectionFactory, ConnectionPool, PoolConfig, PoolMetrics, PooledConnection};
pub use postgres::{PgConnection, PgConnectionFactory};
pub use standin::StandInManager;
pub use store::Datastore;

pub use pulse_core::{
    command_tag, ColumnMeta, Connection, DatastoreConfig, DatastoreError, QueryResult, Result,
    Row, Value,
};

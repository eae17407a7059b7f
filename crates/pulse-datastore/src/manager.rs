//! Pooled connection manager

use std::time::Instant;

use futures::future::BoxFuture;
use pulse_core::{DatastoreConfig, DatastoreError, QueryResult, Result, Value};

use crate::client::{run_in_transaction, DatastoreClient};
use crate::pool::{ConnectionFactory, ConnectionPool, PoolConfig, PoolMetrics};
use crate::postgres::PgConnectionFactory;

/// Bound on statement text length in log records
const STATEMENT_PREVIEW_LEN: usize = 256;
/// Bound on rendered parameter length in log records
const PARAMS_PREVIEW_LEN: usize = 128;

/// Truncate text for a log field, marking the cut
fn preview(text: &str, limit: usize) -> String {
    let mut out: String = text.chars().take(limit).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}

/// Render parameters for a log field
fn render_params(params: &[Value]) -> String {
    let rendered: Vec<String> = params.iter().map(Value::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

/// Access point to the backing store for every persistence-aware caller.
///
/// Hides pool management behind scoped operations: queries and transactions
/// acquire a connection implicitly and release it on every exit path.
/// Connections are opened lazily on first checkout.
pub struct ConnectionManager {
    pool: ConnectionPool,
}

impl ConnectionManager {
    /// Open a manager backed by a PostgreSQL connection pool
    pub fn connect(config: &DatastoreConfig) -> Self {
        Self::with_factory(PoolConfig::from(config), PgConnectionFactory::new(config))
    }

    /// Open a manager over an arbitrary connection factory
    pub fn with_factory<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Self {
        Self {
            pool: ConnectionPool::new(config, factory),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.pool.is_closed() {
            return Err(DatastoreError::Closed);
        }
        Ok(())
    }

    /// Execute one statement on a pooled connection.
    ///
    /// Emits a structured timing record per execution and a structured error
    /// record per failure, with statement and parameters truncated to a
    /// bounded length. Failures carry the full statement and parameters in
    /// the returned error and are never retried here.
    #[tracing::instrument(
        skip(self, statement, params),
        fields(statement = %preview(statement, STATEMENT_PREVIEW_LEN))
    )]
    pub async fn query(&self, statement: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        let connection = self.pool.acquire().await?;
        let started = Instant::now();

        match connection.query(statement, params).await {
            Ok(result) => {
                tracing::debug!(
                    query_id = %result.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    row_count = result.row_count(),
                    "query executed"
                );
                Ok(result)
            }
            Err(err) => {
                tracing::error!(
                    params = %preview(&render_params(params), PARAMS_PREVIEW_LEN),
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "query failed"
                );
                Err(err)
            }
        }
    }

    /// Run a callback with a scoped connection handle.
    ///
    /// The sole primitive through which connections are exposed; the handle
    /// is released on every exit path, including callback failure.
    pub async fn with_client<T, F>(&self, callback: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut DatastoreClient) -> BoxFuture<'c, Result<T>>,
    {
        self.ensure_open()?;
        let connection = self.pool.acquire().await?;
        let mut client = DatastoreClient::pooled(connection);
        callback(&mut client).await
    }

    /// Run a callback inside a transaction on one scoped connection.
    ///
    /// Commits when the callback returns normally; rolls back and re-raises
    /// the callback's error otherwise.
    pub async fn transaction<T, F>(&self, callback: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut DatastoreClient) -> BoxFuture<'c, Result<T>>,
    {
        self.ensure_open()?;
        let connection = self.pool.acquire().await?;
        let mut client = DatastoreClient::pooled(connection);
        run_in_transaction(&mut client, callback).await
    }

    /// Round-trip probe against the backing store.
    ///
    /// The one operation that downgrades failure: any error becomes `false`
    /// instead of propagating.
    pub async fn health_check(&self) -> bool {
        match self.query("SELECT 1", &[]).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "health check failed");
                false
            }
        }
    }

    /// Non-blocking snapshot of the pool state
    pub fn pool_metrics(&self) -> PoolMetrics {
        self.pool.metrics()
    }

    /// Drain and close the pool; idempotent.
    ///
    /// Every subsequent operation fails with [`DatastoreError::Closed`].
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

//! Scoped client handle passed to datastore callbacks

use futures::future::BoxFuture;
use pulse_core::{command_tag, DatastoreError, QueryResult, Result, Value};

use crate::pool::PooledConnection;

/// Connection handle scoped to one callback invocation.
///
/// Wraps either a pooled backend connection or the stand-in; the surface is
/// identical and callers cannot observe which variant they hold. The handle
/// never escapes its callback: the pooled variant returns its connection to
/// the pool when the handle drops, on every exit path.
pub struct DatastoreClient {
    inner: ClientInner,
}

enum ClientInner {
    Pooled(PooledConnection),
    StandIn,
}

impl DatastoreClient {
    pub(crate) fn pooled(connection: PooledConnection) -> Self {
        Self {
            inner: ClientInner::Pooled(connection),
        }
    }

    pub(crate) fn stand_in() -> Self {
        Self {
            inner: ClientInner::StandIn,
        }
    }

    /// Execute one statement and collect its result rows
    pub async fn query(&self, statement: &str, params: &[Value]) -> Result<QueryResult> {
        match &self.inner {
            ClientInner::Pooled(connection) => connection.query(statement, params).await,
            ClientInner::StandIn => Ok(QueryResult::empty(command_tag(statement))),
        }
    }

    /// Execute one statement, returning the affected-row count
    pub async fn execute(&self, statement: &str, params: &[Value]) -> Result<u64> {
        match &self.inner {
            ClientInner::Pooled(connection) => connection.execute(statement, params).await,
            ClientInner::StandIn => Ok(0),
        }
    }
}

/// Run a callback between BEGIN and COMMIT on the given client.
///
/// The callback's failure triggers exactly one ROLLBACK and is re-raised
/// unchanged; only when the rollback itself also fails do both surface
/// together as [`DatastoreError::RollbackFailed`].
pub(crate) async fn run_in_transaction<T, F>(client: &mut DatastoreClient, callback: F) -> Result<T>
where
    F: for<'c> FnOnce(&'c mut DatastoreClient) -> BoxFuture<'c, Result<T>>,
{
    client.execute("BEGIN", &[]).await?;

    match callback(&mut *client).await {
        Ok(value) => {
            client.execute("COMMIT", &[]).await?;
            Ok(value)
        }
        Err(original) => {
            tracing::warn!(error = %original, "transaction callback failed, rolling back");
            match client.execute("ROLLBACK", &[]).await {
                Ok(_) => Err(original),
                Err(rollback) => Err(DatastoreError::RollbackFailed {
                    source: Box::new(original),
                    rollback: Box::new(rollback),
                }),
            }
        }
    }
}

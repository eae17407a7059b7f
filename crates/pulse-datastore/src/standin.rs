//! Stand-in manager for disabled-persistence deployments

use futures::future::BoxFuture;
use pulse_core::{command_tag, QueryResult, Result, Value};

use crate::client::{run_in_transaction, DatastoreClient};
use crate::pool::PoolMetrics;

/// Manager variant with no backing store.
///
/// A permanent, production-reachable mode for deployments that deliberately
/// run without persistence (demos, CI without a database), not a test
/// double. The surface and guarantees match [`ConnectionManager`]
/// exactly, so callers stay oblivious to which variant is active: every
/// operation returns a structurally valid empty result immediately and never
/// fails for store-related reasons.
///
/// [`ConnectionManager`]: crate::ConnectionManager
pub struct StandInManager;

impl StandInManager {
    /// Create the stand-in manager, logging the mode once
    pub fn new() -> Self {
        tracing::info!("persistence disabled; serving empty results without a backing store");
        Self
    }

    /// Execute one statement; always an empty result, never a failure
    pub async fn query(&self, statement: &str, _params: &[Value]) -> Result<QueryResult> {
        Ok(QueryResult::empty(command_tag(statement)))
    }

    /// Run a callback with a scoped stand-in handle
    pub async fn with_client<T, F>(&self, callback: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut DatastoreClient) -> BoxFuture<'c, Result<T>>,
    {
        let mut client = DatastoreClient::stand_in();
        callback(&mut client).await
    }

    /// Run a callback in a transaction; the control statements are no-ops,
    /// the callback's own failure still propagates
    pub async fn transaction<T, F>(&self, callback: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut DatastoreClient) -> BoxFuture<'c, Result<T>>,
    {
        let mut client = DatastoreClient::stand_in();
        run_in_transaction(&mut client, callback).await
    }

    /// Always healthy
    pub async fn health_check(&self) -> bool {
        true
    }

    /// All-zero snapshot
    pub fn pool_metrics(&self) -> PoolMetrics {
        PoolMetrics::disabled()
    }

    /// No-op; there is nothing to drain
    pub async fn close(&self) {}
}

impl Default for StandInManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use pulse_core::DatastoreError;

    use super::*;

    #[tokio::test]
    async fn queries_are_empty_and_never_fail() {
        let manager = StandInManager::new();

        for statement in [
            "SELECT 1",
            "SELECT * FROM campaigns WHERE revenue > $1",
            "INSERT INTO events (kind) VALUES ($1)",
            "DELETE FROM nothing",
        ] {
            let result = manager
                .query(statement, &[Value::Int64(5)])
                .await
                .expect("stand-in never fails");
            assert_eq!(result.row_count(), 0);
            assert_eq!(result.rows_affected, 0);
            assert!(result.rows.is_empty());
        }
    }

    #[tokio::test]
    async fn command_tag_still_derived() {
        let manager = StandInManager::new();
        let result = manager.query("insert into t values (1)", &[]).await.unwrap();
        assert_eq!(result.command, "INSERT");
    }

    #[tokio::test]
    async fn health_is_always_true_and_metrics_zero() {
        let manager = StandInManager::new();
        assert!(manager.health_check().await);

        let metrics = manager.pool_metrics();
        assert_eq!(metrics.total(), 0);
        assert_eq!(metrics.active(), 0);
        assert_eq!(metrics.waiting(), 0);
        assert_eq!(metrics.utilization(), 0.0);
    }

    #[tokio::test]
    async fn callbacks_see_empty_results() {
        let manager = StandInManager::new();
        let count = manager
            .with_client(|client| {
                async move {
                    let result = client.query("SELECT * FROM metrics", &[]).await?;
                    Ok(result.row_count())
                }
                .boxed()
            })
            .await
            .expect("with_client");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn transaction_callback_error_propagates_unchanged() {
        let manager = StandInManager::new();
        let result: Result<()> = manager
            .transaction(|_client| {
                async { Err(DatastoreError::Connection("callback exploded".into())) }.boxed()
            })
            .await;
        match result {
            Err(DatastoreError::Connection(message)) => assert_eq!(message, "callback exploded"),
            other => panic!("expected the original error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_is_a_no_op() {
        let manager = StandInManager::new();
        manager.close().await;
        manager.close().await;

        // Operations keep succeeding with empty results.
        let result = manager.query("SELECT 1", &[]).await.expect("still serving");
        assert_eq!(result.row_count(), 0);
        assert!(manager.health_check().await);
    }
}

//! Composition-time selection between the manager variants

use futures::future::BoxFuture;
use pulse_core::{DatastoreConfig, QueryResult, Result, Value};

use crate::client::DatastoreClient;
use crate::manager::ConnectionManager;
use crate::pool::PoolMetrics;
use crate::standin::StandInManager;

/// The process-wide datastore handle.
///
/// Built exactly once by [`Datastore::from_config`], which reads the
/// persistence flag and binds one of two interchangeable variants for the
/// remainder of the process lifetime; there is no hot-swap path. Wrap the
/// value in an `Arc` and inject it into every persistence-aware component.
/// Callers depend only on the operations here and must not (and cannot)
/// observe which variant is active.
pub enum Datastore {
    /// Real backing store behind a bounded connection pool
    Pooled(ConnectionManager),
    /// No backing store; empty-but-valid results
    StandIn(StandInManager),
}

impl Datastore {
    /// One-time selection gate.
    ///
    /// `persistence_enabled` picks the variant; the pooled variant opens its
    /// connections lazily on first checkout, so construction itself performs
    /// no I/O.
    pub fn from_config(config: &DatastoreConfig) -> Self {
        if config.persistence_enabled {
            Datastore::Pooled(ConnectionManager::connect(config))
        } else {
            Datastore::StandIn(StandInManager::new())
        }
    }

    /// Execute one statement
    pub async fn query(&self, statement: &str, params: &[Value]) -> Result<QueryResult> {
        match self {
            Datastore::Pooled(manager) => manager.query(statement, params).await,
            Datastore::StandIn(manager) => manager.query(statement, params).await,
        }
    }

    /// Run a callback with a scoped connection handle
    pub async fn with_client<T, F>(&self, callback: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut DatastoreClient) -> BoxFuture<'c, Result<T>>,
    {
        match self {
            Datastore::Pooled(manager) => manager.with_client(callback).await,
            Datastore::StandIn(manager) => manager.with_client(callback).await,
        }
    }

    /// Run a callback inside a transaction
    pub async fn transaction<T, F>(&self, callback: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut DatastoreClient) -> BoxFuture<'c, Result<T>>,
    {
        match self {
            Datastore::Pooled(manager) => manager.transaction(callback).await,
            Datastore::StandIn(manager) => manager.transaction(callback).await,
        }
    }

    /// Round-trip health probe; failures report `false`, never an error
    pub async fn health_check(&self) -> bool {
        match self {
            Datastore::Pooled(manager) => manager.health_check().await,
            Datastore::StandIn(manager) => manager.health_check().await,
        }
    }

    /// Non-blocking snapshot of the pool state
    pub fn pool_metrics(&self) -> PoolMetrics {
        match self {
            Datastore::Pooled(manager) => manager.pool_metrics(),
            Datastore::StandIn(manager) => manager.pool_metrics(),
        }
    }

    /// Release held resources; idempotent
    pub async fn close(&self) {
        match self {
            Datastore::Pooled(manager) => manager.close().await,
            Datastore::StandIn(manager) => manager.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use pulse_core::DatastoreError;

    use super::*;

    fn config(persistence_enabled: bool) -> DatastoreConfig {
        DatastoreConfig {
            persistence_enabled,
            ..DatastoreConfig::default()
        }
    }

    /// Caller code stays variant-agnostic: this helper only sees the handle.
    async fn count_campaigns(store: &Datastore) -> Result<usize> {
        let result = store.query("SELECT id FROM campaigns", &[]).await?;
        Ok(result.row_count())
    }

    #[tokio::test]
    async fn disabled_persistence_serves_empty_results() {
        let store = Datastore::from_config(&config(false));

        let result = store.query("SELECT 1", &[]).await.expect("no exception");
        assert_eq!(result.row_count(), 0);
        assert!(result.rows.is_empty());

        assert!(store.health_check().await);
        assert_eq!(store.pool_metrics().total(), 0);
        assert_eq!(count_campaigns(&store).await.expect("oblivious caller"), 0);
    }

    #[tokio::test]
    async fn enabled_persistence_binds_the_pooled_variant() {
        let store = Datastore::from_config(&config(true));
        assert!(matches!(store, Datastore::Pooled(_)));

        // Lazy pool: nothing is open yet, but the bounds are published.
        let metrics = store.pool_metrics();
        assert_eq!(metrics.total(), 0);
        assert_eq!(metrics.max_size(), 10);
    }

    #[tokio::test]
    async fn pooled_variant_rejects_use_after_close_without_io() {
        let store = Datastore::from_config(&config(true));

        store.close().await;
        store.close().await;

        assert!(matches!(
            store.query("SELECT 1", &[]).await,
            Err(DatastoreError::Closed)
        ));
    }

    #[tokio::test]
    async fn stand_in_transactions_run_their_callbacks() {
        let store = Datastore::from_config(&config(false));

        let echoed = store
            .transaction(|client| {
                async move {
                    client
                        .execute("INSERT INTO events (kind) VALUES ($1)", &["sync".into()])
                        .await?;
                    Ok("done")
                }
                .boxed()
            })
            .await
            .expect("transaction");
        assert_eq!(echoed, "done");
    }
}

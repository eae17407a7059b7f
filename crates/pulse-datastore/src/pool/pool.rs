//! Connection pool implementation

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use pulse_core::{Connection, DatastoreError, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::config::PoolConfig;
use super::metrics::PoolMetrics;

/// Factory trait for creating new connections
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new connection
    async fn create(&self) -> Result<Arc<dyn Connection>>;

    /// Validate that an idle connection is still usable
    ///
    /// Default implementation checks the connection's own closed state.
    async fn validate(&self, conn: &dyn Connection) -> bool {
        !conn.is_closed()
    }
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        (**self).create().await
    }

    async fn validate(&self, conn: &dyn Connection) -> bool {
        (**self).validate(conn).await
    }
}

/// An idle connection parked in the pool
struct IdleConnection {
    connection: Arc<dyn Connection>,
    parked_at: Instant,
}

impl IdleConnection {
    fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            parked_at: Instant::now(),
        }
    }
}

/// State shared between the pool handle and outstanding checkout guards
struct PoolShared {
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory>,
    /// Available idle connections
    idle: Mutex<VecDeque<IdleConnection>>,
    /// Bounds the number of concurrently checked-out connections
    semaphore: Arc<Semaphore>,
    /// Number of connections currently checked out
    active_count: AtomicUsize,
    /// Number of callers waiting for a connection
    waiting_count: AtomicUsize,
    closed: AtomicBool,
}

impl PoolShared {
    fn return_connection(&self, connection: Arc<dyn Connection>) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);

        // A closed pool or a dead connection takes nothing back.
        if self.closed.load(Ordering::SeqCst) || connection.is_closed() {
            return;
        }

        self.idle.lock().push_back(IdleConnection::new(connection));
    }
}

/// A bounded pool of connections to the backing store
///
/// Connections are created lazily on first checkout and handed to callers
/// through [`PooledConnection`] guards. The number of concurrently
/// checked-out connections never exceeds the configured maximum; callers
/// that cannot acquire one within the acquire timeout fail rather than
/// block indefinitely.
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

impl ConnectionPool {
    /// Create a new connection pool with the given configuration and factory
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_size()));
        Self {
            shared: Arc::new(PoolShared {
                config,
                factory: Arc::new(factory),
                idle: Mutex::new(VecDeque::new()),
                semaphore,
                active_count: AtomicUsize::new(0),
                waiting_count: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Check out a connection from the pool
    ///
    /// This will:
    /// 1. Take an idle connection if one is parked (evicting stale ones)
    /// 2. If none and under max_size, create a new connection
    /// 3. If at max_size, wait for a connection to be returned
    ///
    /// Fails with [`DatastoreError::AcquireTimeout`] when the acquire
    /// timeout elapses first; a timed-out caller holds nothing and needs no
    /// cleanup. Fails with [`DatastoreError::Closed`] once the pool is
    /// closed.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(DatastoreError::Closed);
        }

        let timeout = self.shared.config.acquire_timeout();
        self.shared.waiting_count.fetch_add(1, Ordering::SeqCst);
        let outcome = tokio::time::timeout(timeout, self.checkout()).await;
        self.shared.waiting_count.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Ok(result) => result,
            Err(_) => Err(DatastoreError::AcquireTimeout { timeout }),
        }
    }

    async fn checkout(&self) -> Result<PooledConnection> {
        // The permit caps concurrent checkouts; it closes with the pool.
        let permit = Arc::clone(&self.shared.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DatastoreError::Closed)?;

        let connection = match self.take_idle().await {
            Some(connection) => connection,
            None => self.shared.factory.create().await?,
        };

        self.shared.active_count.fetch_add(1, Ordering::SeqCst);

        Ok(PooledConnection {
            connection: Some(connection),
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    /// Take an idle connection, evicting ones that out-idled the timeout or
    /// fail validation
    async fn take_idle(&self) -> Option<Arc<dyn Connection>> {
        loop {
            let parked = { self.shared.idle.lock().pop_front() };

            match parked {
                Some(idle) => {
                    if idle.parked_at.elapsed() > self.shared.config.idle_timeout() {
                        let _ = idle.connection.close().await;
                        continue;
                    }

                    if !self.shared.factory.validate(&*idle.connection).await {
                        let _ = idle.connection.close().await;
                        continue;
                    }

                    return Some(idle.connection);
                }
                None => return None,
            }
        }
    }

    /// Take a non-blocking snapshot of the pool state
    pub fn metrics(&self) -> PoolMetrics {
        let idle = self.shared.idle.lock().len();
        let active = self.shared.active_count.load(Ordering::SeqCst);
        let waiting = self.shared.waiting_count.load(Ordering::SeqCst);
        PoolMetrics::capture(idle, active, waiting, self.shared.config.max_size())
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Drain and close the pool; idempotent
    ///
    /// Pending and future checkouts fail once the pool is closed.
    /// Connections still checked out are discarded when their guards drop.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shared.semaphore.close();

        let drained: Vec<IdleConnection> = { self.shared.idle.lock().drain(..).collect() };
        for idle in drained {
            let _ = idle.connection.close().await;
        }

        tracing::debug!("connection pool closed");
    }
}

/// A connection checked out from the pool
///
/// Dereferences to the underlying [`Connection`]. Dropping the guard returns
/// the connection to the pool on every exit path.
pub struct PooledConnection {
    connection: Option<Arc<dyn Connection>>,
    shared: Arc<PoolShared>,
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection", &self.connection.is_some())
            .finish()
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_deref()
            .expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.shared.return_connection(connection);
        }
    }
}

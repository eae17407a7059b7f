//! Connection capability trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{QueryResult, Value};

/// A live connection to the backing store.
///
/// Implemented by the PostgreSQL backend and by test doubles. Connections are
/// handed out exclusively through the pool's scoped guards; nothing outside
/// the pool holds one past the scope that acquired it.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Backend identifier used in log records (e.g. "postgres")
    fn backend_name(&self) -> &str;

    /// Execute one statement and collect its result rows
    async fn query(&self, statement: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute one statement, returning only the affected-row count.
    ///
    /// Also used for the transaction control statements (BEGIN, COMMIT,
    /// ROLLBACK), which bind no parameters.
    async fn execute(&self, statement: &str, params: &[Value]) -> Result<u64>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Whether the connection has been closed locally or dropped by the server
    fn is_closed(&self) -> bool;
}

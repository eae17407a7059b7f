//! PostgreSQL backend
//!
//! Implements the [`Connection`] capability over tokio-postgres. Statements
//! are prepared before execution so parameter types and column metadata are
//! known up front; empty result sets still carry their columns.

mod values;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::TryStreamExt;
use pulse_core::{
    command_tag, ColumnMeta, Connection, DatastoreConfig, DatastoreError, QueryResult, Result,
    Value,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use uuid::Uuid;

use crate::pool::ConnectionFactory;
use values::{bind_params, decode_row};

/// Compose a readable message from a PostgreSQL error, keeping the server's
/// detail, hint, and SQLSTATE code when present
fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        if !detail.trim().is_empty() {
            message.push_str(&format!(" (detail: {detail})"));
        }
    }

    if let Some(hint) = db_error.hint() {
        if !hint.trim().is_empty() {
            message.push_str(&format!(" (hint: {hint})"));
        }
    }

    format!("{message} (code: {})", db_error.code().code())
}

/// One live PostgreSQL session
pub struct PgConnection {
    client: Client,
    closed: AtomicBool,
}

impl PgConnection {
    /// Connect to the configured database and spawn the connection driver
    /// task onto the ambient runtime
    pub async fn connect(config: &DatastoreConfig) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .user(&config.user)
            .password(&config.password)
            .dbname(&config.database);

        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            DatastoreError::Connection(format!(
                "failed to connect to PostgreSQL at {}:{}: {}",
                config.host,
                config.port,
                format_postgres_error(&e)
            ))
        })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "PostgreSQL connection established"
        );

        Ok(Self {
            client,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Connection for PgConnection {
    fn backend_name(&self) -> &str {
        "postgres"
    }

    #[tracing::instrument(
        skip(self, statement, params),
        fields(statement_preview = %statement.chars().take(100).collect::<String>())
    )]
    async fn query(&self, statement: &str, params: &[Value]) -> Result<QueryResult> {
        let started = Instant::now();

        let prepared = self
            .client
            .prepare(statement)
            .await
            .map_err(|e| DatastoreError::query(statement, params, format_postgres_error(&e)))?;

        let columns: Vec<ColumnMeta> = prepared
            .columns()
            .iter()
            .enumerate()
            .map(|(ordinal, column)| ColumnMeta {
                name: column.name().to_string(),
                data_type: column.type_().name().to_string(),
                ordinal,
            })
            .collect();
        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let bound = bind_params(&prepared, params);
        let stream = self
            .client
            .query_raw(&prepared, bound.iter().map(|p| p as &dyn ToSql))
            .await
            .map_err(|e| DatastoreError::query(statement, params, format_postgres_error(&e)))?;
        futures::pin_mut!(stream);

        let mut rows = Vec::new();
        while let Some(pg_row) = stream
            .try_next()
            .await
            .map_err(|e| DatastoreError::query(statement, params, format_postgres_error(&e)))?
        {
            rows.push(decode_row(&pg_row, &column_names));
        }
        let rows_affected = stream.rows_affected().unwrap_or(0);

        let execution_time_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms,
            "query executed"
        );

        Ok(QueryResult {
            id: Uuid::new_v4(),
            columns,
            rows,
            rows_affected,
            command: command_tag(statement),
            execution_time_ms,
        })
    }

    async fn execute(&self, statement: &str, params: &[Value]) -> Result<u64> {
        let prepared = self
            .client
            .prepare(statement)
            .await
            .map_err(|e| DatastoreError::query(statement, params, format_postgres_error(&e)))?;

        let bound = bind_params(&prepared, params);
        let refs: Vec<&(dyn ToSql + Sync)> =
            bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let rows_affected = self
            .client
            .execute(&prepared, &refs)
            .await
            .map_err(|e| DatastoreError::query(statement, params, format_postgres_error(&e)))?;

        tracing::debug!(rows_affected, "statement executed");
        Ok(rows_affected)
    }

    async fn close(&self) -> Result<()> {
        // The session itself terminates when the client drops; the flag keeps
        // the pool from handing this connection out again.
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.client.is_closed()
    }
}

/// Factory producing PostgreSQL connections for the pool
pub struct PgConnectionFactory {
    config: DatastoreConfig,
}

impl PgConnectionFactory {
    /// Create a factory for the given datastore configuration
    pub fn new(config: &DatastoreConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        let connection = PgConnection::connect(&self.config).await?;
        Ok(Arc::new(connection))
    }
}

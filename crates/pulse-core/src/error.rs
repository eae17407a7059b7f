//! Error types for datastore operations

use std::time::Duration;

use thiserror::Error;

use crate::types::Value;

/// Result type alias for datastore operations
pub type Result<T> = std::result::Result<T, DatastoreError>;

/// Boxed backend cause, kept in the chain for diagnosis
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error taxonomy for the data-access layer.
///
/// The managers never retry a failed operation and never convert a failure
/// into an empty success; every variant here reaches the caller as-is.
#[derive(Error, Debug)]
pub enum DatastoreError {
    /// The pool stayed saturated beyond the configured wait. Recoverable by
    /// caller-side retry or backoff; a timed-out caller holds no connection.
    #[error("timed out after {timeout:?} waiting for a pooled connection")]
    AcquireTimeout {
        /// The configured acquisition timeout that elapsed
        timeout: Duration,
    },

    /// Statement execution failed. Carries the full statement text and the
    /// rendered parameters; log emission truncates both to a bounded length.
    #[error("query failed: {source}")]
    Query {
        /// The statement that failed, untruncated
        statement: String,
        /// Rendered parameter values, untruncated
        params: Vec<String>,
        /// The underlying backend error
        source: BoxedCause,
    },

    /// A transaction callback failed and the rollback statement failed too.
    /// Both failures stay observable; a successful rollback re-raises the
    /// callback error unchanged instead of producing this variant.
    #[error("transaction rollback failed: {rollback} (original error: {source})")]
    RollbackFailed {
        /// The error the callback raised
        source: Box<DatastoreError>,
        /// The error the rollback statement raised
        rollback: Box<DatastoreError>,
    },

    /// Operation attempted after `close()`
    #[error("datastore is closed")]
    Closed,

    /// Connect/handshake failure against the backing store
    #[error("connection error: {0}")]
    Connection(String),

    /// Invalid or malformed configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatastoreError {
    /// Build a [`DatastoreError::Query`] from a statement, its parameters,
    /// and the backend cause.
    pub fn query(
        statement: impl Into<String>,
        params: &[Value],
        source: impl Into<BoxedCause>,
    ) -> Self {
        Self::Query {
            statement: statement.into(),
            params: params.iter().map(Value::to_string).collect(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_carries_statement_and_params() {
        let err = DatastoreError::query(
            "SELECT * FROM metrics WHERE day = $1",
            &[Value::String("2026-08-01".into())],
            "relation \"metrics\" does not exist",
        );
        match err {
            DatastoreError::Query {
                statement, params, ..
            } => {
                assert_eq!(statement, "SELECT * FROM metrics WHERE day = $1");
                assert_eq!(params, vec!["2026-08-01".to_string()]);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn rollback_failed_surfaces_both_errors() {
        let original = DatastoreError::query("INSERT INTO t VALUES (1)", &[], "boom");
        let rollback = DatastoreError::Connection("connection reset".into());
        let err = DatastoreError::RollbackFailed {
            source: Box::new(original),
            rollback: Box::new(rollback),
        };
        let message = err.to_string();
        assert!(message.contains("connection reset"));
        assert!(message.contains("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn acquire_timeout_display() {
        let err = DatastoreError::AcquireTimeout {
            timeout: Duration::from_millis(100),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 100ms waiting for a pooled connection"
        );
    }

    #[test]
    fn closed_display() {
        assert_eq!(DatastoreError::Closed.to_string(), "datastore is closed");
    }
}

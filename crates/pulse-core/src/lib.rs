//! Pulse Core - shared vocabulary for the analytics backend
//!
//! This crate defines the types every persistence-aware component speaks:
//! query values and results, the [`Connection`] capability trait implemented
//! by the real backend and by test doubles, the [`DatastoreError`] taxonomy,
//! and the environment-driven [`DatastoreConfig`].

pub mod config;
pub mod connection;
pub mod error;
pub mod types;

pub use config::DatastoreConfig;
pub use connection::Connection;
pub use error::{DatastoreError, Result};
pub use types::{command_tag, ColumnMeta, QueryResult, Row, Value};

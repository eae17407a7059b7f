//! Environment-driven datastore configuration

use serde::{Deserialize, Serialize};

use crate::error::{DatastoreError, Result};

const ENV_HOST: &str = "DATABASE_HOST";
const ENV_PORT: &str = "DATABASE_PORT";
const ENV_USER: &str = "DATABASE_USER";
const ENV_PASSWORD: &str = "DATABASE_PASSWORD";
const ENV_NAME: &str = "DATABASE_NAME";
const ENV_POOL_MAX: &str = "DATABASE_POOL_MAX";
const ENV_ACQUIRE_TIMEOUT_MS: &str = "DATABASE_ACQUIRE_TIMEOUT_MS";
const ENV_IDLE_TIMEOUT_MS: &str = "DATABASE_IDLE_TIMEOUT_MS";
const ENV_PERSISTENCE_ENABLED: &str = "PERSISTENCE_ENABLED";

/// Configuration for the data-access layer.
///
/// `persistence_enabled` drives the one-time selection between the pooled
/// manager and the stand-in; everything else describes the backing store and
/// the pool bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Backing store host
    pub host: String,
    /// Backing store port
    pub port: u16,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Database name
    pub database: String,
    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Timeout in milliseconds when acquiring a connection from the pool
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Timeout in milliseconds before an idle connection is closed
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// When false, the composition gate binds the stand-in manager instead
    /// of opening a real pool
    #[serde(default = "default_persistence_enabled")]
    pub persistence_enabled: bool,
}

fn default_max_connections() -> usize {
    10
}

fn default_acquire_timeout_ms() -> u64 {
    30_000
}

fn default_idle_timeout_ms() -> u64 {
    600_000
}

fn default_persistence_enabled() -> bool {
    true
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "pulse".to_string(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            persistence_enabled: default_persistence_enabled(),
        }
    }
}

impl DatastoreConfig {
    /// Load configuration from process environment variables.
    ///
    /// Unset variables keep their defaults; set-but-malformed values are
    /// [`DatastoreError::Configuration`] errors, never silent fallbacks.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an injected variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(raw) = lookup(ENV_PORT) {
            config.port = parse_number(ENV_PORT, &raw)?;
        }
        if let Some(user) = lookup(ENV_USER) {
            config.user = user;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            config.password = password;
        }
        if let Some(database) = lookup(ENV_NAME) {
            config.database = database;
        }
        if let Some(raw) = lookup(ENV_POOL_MAX) {
            config.max_connections = parse_number(ENV_POOL_MAX, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ACQUIRE_TIMEOUT_MS) {
            config.acquire_timeout_ms = parse_number(ENV_ACQUIRE_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_IDLE_TIMEOUT_MS) {
            config.idle_timeout_ms = parse_number(ENV_IDLE_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PERSISTENCE_ENABLED) {
            config.persistence_enabled = parse_flag(ENV_PERSISTENCE_ENABLED, &raw)?;
        }

        if config.max_connections == 0 {
            return Err(DatastoreError::Configuration(format!(
                "{ENV_POOL_MAX} must be greater than 0"
            )));
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| DatastoreError::Configuration(format!("invalid value for {key}: {raw:?}")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DatastoreError::Configuration(format!(
            "invalid value for {key}: {raw:?}"
        ))),
    }
}

//! Identity Service configuration.
//!
//! Configuration is loaded from environment variables. The redis URL may
//! carry credentials and is redacted in Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default collection (key namespace) for identity documents.
pub const DEFAULT_COLLECTION: &str = "zero-auth";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Shared redis instance (production).
    Redis,
    /// Process-local map. Identities are lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidStoreBackend(format!(
                "STORE_BACKEND must be 'redis' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

/// How a first-contact identity is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Atomic create that only succeeds when no document exists yet.
    /// Concurrent first contacts all observe the same stored identity.
    CreateIfAbsent,
    /// Unconditional full overwrite after a miss. Concurrent first contacts
    /// race and the last write wins.
    Overwrite,
}

impl FromStr for WriteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_if_absent" => Ok(WriteMode::CreateIfAbsent),
            "overwrite" => Ok(WriteMode::Overwrite),
            other => Err(ConfigError::InvalidWriteMode(format!(
                "IDENTITY_WRITE_MODE must be 'create_if_absent' or 'overwrite', got '{}'",
                other
            ))),
        }
    }
}

/// Identity Service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Document store backend.
    pub store_backend: StoreBackend,

    /// Redis connection URL. Required for the redis backend.
    pub redis_url: Option<String>,

    /// Collection name, used as the redis key prefix.
    pub collection: String,

    /// Persistence strategy for newly generated identities.
    pub write_mode: WriteMode,

    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Drain period after a shutdown signal, in seconds.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("store_backend", &self.store_backend)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("collection", &self.collection)
            .field("write_mode", &self.write_mode)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid store backend: {0}")]
    InvalidStoreBackend(String),

    #[error("Invalid write mode: {0}")]
    InvalidWriteMode(String),

    #[error("Invalid collection: {0}")]
    InvalidCollection(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let store_backend = match vars.get("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => StoreBackend::Redis,
        };

        let redis_url = vars.get("REDIS_URL").cloned();
        if store_backend == StoreBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingEnvVar("REDIS_URL".to_string()));
        }

        let collection = vars
            .get("IDENTITY_COLLECTION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

        if collection.trim().is_empty() {
            return Err(ConfigError::InvalidCollection(
                "IDENTITY_COLLECTION must not be empty".to_string(),
            ));
        }

        let write_mode = match vars.get("IDENTITY_WRITE_MODE") {
            Some(value) => value.parse()?,
            None => WriteMode::CreateIfAbsent,
        };

        // Parse request timeout with validation
        let request_timeout_seconds = if let Some(value_str) = vars.get("REQUEST_TIMEOUT_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRequestTimeout(format!(
                    "REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRequestTimeout(
                    "REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_REQUEST_TIMEOUT_SECONDS
        };

        let drain_seconds = match vars.get("DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            bind_address,
            store_backend,
            redis_url,
            collection,
            write_mode,
            request_timeout_seconds,
            drain_seconds,
        })
    }
}

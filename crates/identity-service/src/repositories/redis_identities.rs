//! Redis-backed identity store.
//!
//! # Key Patterns
//!
//! - `{collection}:{browser_id}` - Identity document (HASH)
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is cheap to clone and safe to use
//! concurrently, so each operation clones it instead of locking.

use crate::errors::IdentityError;
use crate::models::{Identity, NewIdentity};
use crate::observability::metrics::record_store_operation;
use crate::repositories::{lua_scripts, CreateOutcome, IdentityStore};
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

/// Identity store on a shared redis instance.
#[derive(Clone)]
pub struct RedisIdentityStore {
    /// Multiplexed connection (cheaply cloneable, designed for concurrent use).
    connection: MultiplexedConnection,
    /// Key prefix for identity documents.
    collection: String,
    set_script: Script,
    create_script: Script,
}

impl RedisIdentityStore {
    /// Connect to redis.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Store` if the client cannot be opened or the
    /// connection fails.
    pub async fn connect(redis_url: &str, collection: &str) -> Result<Self, IdentityError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Do not log redis_url, it may contain credentials
            error!(target: "identity.store.redis", error = %e, "Failed to open Redis client");
            IdentityError::Store(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "identity.store.redis", error = %e, "Failed to connect to Redis");
                IdentityError::Store(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            collection: collection.to_string(),
            set_script: Script::new(lua_scripts::SET_IDENTITY),
            create_script: Script::new(lua_scripts::CREATE_IDENTITY_IF_ABSENT),
        })
    }

    fn key(&self, browser_id: &str) -> String {
        document_key(&self.collection, browser_id)
    }
}

/// Redis key of the identity document for `browser_id`.
pub fn document_key(collection: &str, browser_id: &str) -> String {
    format!("{collection}:{browser_id}")
}

/// Convert a HGETALL reply into an identity.
///
/// An empty reply means the document does not exist.
pub fn identity_from_fields(
    mut fields: HashMap<String, String>,
) -> Result<Option<Identity>, IdentityError> {
    if fields.is_empty() {
        return Ok(None);
    }

    let mut take = |name: &str| {
        fields
            .remove(name)
            .ok_or_else(|| IdentityError::CorruptRecord(format!("missing field '{name}'")))
    };

    let browser_id = take("browser_id")?;
    let username = take("username")?;
    let color = take("color")?;
    let created_at_raw = take("created_at")?;

    let created_at = parse_created_at(&created_at_raw)?;

    Ok(Some(Identity {
        browser_id,
        username,
        color,
        created_at,
    }))
}

fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, IdentityError> {
    let millis: i64 = raw
        .parse()
        .map_err(|_| IdentityError::CorruptRecord(format!("invalid created_at '{raw}'")))?;

    timestamp_from_millis(millis)
}

fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>, IdentityError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| IdentityError::CorruptRecord(format!("created_at out of range: {millis}")))
}

fn status_label<T>(result: &Result<T, IdentityError>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

impl RedisIdentityStore {
    async fn fetch(&self, browser_id: &str) -> Result<Option<Identity>, IdentityError> {
        let mut conn = self.connection.clone();
        let key = self.key(browser_id);

        let fields: HashMap<String, String> = conn.hgetall(&key).await.map_err(|e| {
            warn!(target: "identity.store.redis", error = %e, "Failed to get identity");
            IdentityError::Store(format!("Failed to get identity: {e}"))
        })?;

        identity_from_fields(fields)
    }

    async fn overwrite(&self, record: &NewIdentity) -> Result<Identity, IdentityError> {
        let mut conn = self.connection.clone();
        let key = self.key(&record.browser_id);

        let created_at_millis: i64 = self
            .set_script
            .key(&key)
            .arg(&record.browser_id)
            .arg(&record.username)
            .arg(&record.color)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "identity.store.redis", error = %e, "Failed to store identity");
                IdentityError::Store(format!("Failed to store identity: {e}"))
            })?;

        let created_at = timestamp_from_millis(created_at_millis)?;
        debug!(target: "identity.store.redis", username = %record.username, "Stored identity");

        Ok(record.clone().into_identity(created_at))
    }

    async fn create(&self, record: &NewIdentity) -> Result<CreateOutcome, IdentityError> {
        let mut conn = self.connection.clone();
        let key = self.key(&record.browser_id);

        let reply: i64 = self
            .create_script
            .key(&key)
            .arg(&record.browser_id)
            .arg(&record.username)
            .arg(&record.color)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "identity.store.redis", error = %e, "Failed to create identity");
                IdentityError::Store(format!("Failed to create identity: {e}"))
            })?;

        if reply < 0 {
            debug!(target: "identity.store.redis", "Identity already exists, nothing written");
            return Ok(CreateOutcome::AlreadyExists);
        }

        let created_at = timestamp_from_millis(reply)?;
        debug!(target: "identity.store.redis", username = %record.username, "Created identity");

        Ok(CreateOutcome::Created(record.clone().into_identity(created_at)))
    }
}

#[async_trait::async_trait]
impl IdentityStore for RedisIdentityStore {
    #[instrument(skip_all, name = "identity.store.redis.get")]
    async fn get(&self, browser_id: &str) -> Result<Option<Identity>, IdentityError> {
        let start = Instant::now();
        let result = self.fetch(browser_id).await;
        record_store_operation("get", status_label(&result), start.elapsed());
        result
    }

    #[instrument(skip_all, name = "identity.store.redis.set")]
    async fn set(&self, record: &NewIdentity) -> Result<Identity, IdentityError> {
        let start = Instant::now();
        let result = self.overwrite(record).await;
        record_store_operation("set", status_label(&result), start.elapsed());
        result
    }

    #[instrument(skip_all, name = "identity.store.redis.create_if_absent")]
    async fn create_if_absent(
        &self,
        record: &NewIdentity,
    ) -> Result<CreateOutcome, IdentityError> {
        let start = Instant::now();
        let result = self.create(record).await;
        record_store_operation("create_if_absent", status_label(&result), start.elapsed());
        result
    }

    #[instrument(skip_all, name = "identity.store.redis.ping")]
    async fn ping(&self) -> Result<(), IdentityError> {
        let mut conn = self.connection.clone();

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(IdentityError::Store(format!("Unexpected PING reply: {pong}")));
        }

        Ok(())
    }
}

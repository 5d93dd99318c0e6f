//! Repository layer for Identity Service.
//!
//! The document store is an external keyed-document service addressed by
//! collection and `browser_id`. `IdentityStore` is the seam the resolver is
//! written against; backends are selected at startup and injected.
//!
//! # Backends
//!
//! - `RedisIdentityStore` - shared redis, one HASH per identity
//! - `InMemoryIdentityStore` - process-local map for development and tests

pub mod lua_scripts;
pub mod memory;
pub mod redis_identities;

use crate::errors::IdentityError;
use crate::models::{Identity, NewIdentity};

pub use memory::InMemoryIdentityStore;
pub use redis_identities::RedisIdentityStore;

/// Result of a conditional create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The record was written.
    Created(Identity),
    /// A document already existed under the key; nothing was written.
    AlreadyExists,
}

/// Keyed document store holding identity records.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch the identity stored under `browser_id`, if any.
    async fn get(&self, browser_id: &str) -> Result<Option<Identity>, IdentityError>;

    /// Write `record` as a full overwrite. The store assigns `created_at`.
    async fn set(&self, record: &NewIdentity) -> Result<Identity, IdentityError>;

    /// Write `record` only if no document exists under its key.
    async fn create_if_absent(&self, record: &NewIdentity)
        -> Result<CreateOutcome, IdentityError>;

    /// Check store connectivity.
    async fn ping(&self) -> Result<(), IdentityError>;
}

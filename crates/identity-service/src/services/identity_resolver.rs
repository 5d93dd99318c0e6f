//! Identity resolution (get-or-create).
//!
//! Looks the browser id up in the store and returns the stored identity, or
//! generates, persists and returns a new one. No state is kept between
//! calls; the store is the only shared resource.
//!
//! # Write modes
//!
//! - `CreateIfAbsent`: the write is conditional. A caller that loses a race
//!   against a concurrent first contact re-reads and returns the winner's
//!   identity, so every caller sees what is persisted.
//! - `Overwrite`: the write is an unconditional full overwrite. Two
//!   concurrent first contacts both write; the store keeps the last one and
//!   the other caller holds an identity that was never persisted.

use crate::config::WriteMode;
use crate::errors::IdentityError;
use crate::models::{Identity, NewIdentity, ResolvedIdentity};
use crate::observability::metrics::record_identity_resolution;
use crate::repositories::{CreateOutcome, IdentityStore};
use crate::services::name_generator::{generate_color, generate_username};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Which branch a resolution took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Identity was already stored.
    Existing,
    /// This call persisted a new identity.
    Created,
    /// A concurrent caller persisted first; its identity was returned.
    Conflict,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Existing => "existing",
            Outcome::Created => "created",
            Outcome::Conflict => "conflict",
        }
    }
}

/// Get-or-create resolver over an injected identity store.
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    write_mode: WriteMode,
    /// Seeded generator for reproducible identities. `None` uses the thread RNG.
    seeded_rng: Option<Mutex<StdRng>>,
}

impl IdentityResolver {
    /// Create a resolver over `store`.
    pub fn new(store: Arc<dyn IdentityStore>, write_mode: WriteMode) -> Self {
        Self {
            store,
            write_mode,
            seeded_rng: None,
        }
    }

    /// Create a resolver whose generated identities follow `seed`.
    pub fn with_seed(store: Arc<dyn IdentityStore>, write_mode: WriteMode, seed: u64) -> Self {
        Self {
            store,
            write_mode,
            seeded_rng: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Check that the backing store is reachable.
    pub async fn store_ready(&self) -> Result<(), IdentityError> {
        self.store.ping().await
    }

    /// Return the identity for `browser_id`, creating it on first contact.
    ///
    /// # Errors
    ///
    /// - `IdentityError::BadRequest` if `browser_id` is empty
    /// - store errors are returned unchanged, no retries are attempted
    #[instrument(skip_all, name = "identity.resolver.resolve")]
    pub async fn resolve(&self, browser_id: &str) -> Result<ResolvedIdentity, IdentityError> {
        if browser_id.is_empty() {
            return Err(IdentityError::BadRequest(
                "browser_id is required".to_string(),
            ));
        }

        match self.get_or_create(browser_id).await {
            Ok((identity, outcome)) => {
                record_identity_resolution(outcome.as_str());
                Ok(ResolvedIdentity {
                    username: identity.username,
                    color: identity.color,
                    created: outcome == Outcome::Created,
                })
            }
            Err(e) => {
                record_identity_resolution("error");
                Err(e)
            }
        }
    }

    async fn get_or_create(&self, browser_id: &str) -> Result<(Identity, Outcome), IdentityError> {
        if let Some(existing) = self.store.get(browser_id).await? {
            debug!(target: "identity.resolver", "Returning stored identity");
            return Ok((existing, Outcome::Existing));
        }

        let record = self.generate(browser_id);

        match self.write_mode {
            WriteMode::Overwrite => {
                let stored = self.store.set(&record).await?;
                info!(target: "identity.resolver", username = %stored.username, "Created identity");
                Ok((stored, Outcome::Created))
            }
            WriteMode::CreateIfAbsent => match self.store.create_if_absent(&record).await? {
                CreateOutcome::Created(stored) => {
                    info!(target: "identity.resolver", username = %stored.username, "Created identity");
                    Ok((stored, Outcome::Created))
                }
                CreateOutcome::AlreadyExists => {
                    warn!(
                        target: "identity.resolver",
                        "Concurrent first contact persisted first, returning stored identity"
                    );
                    let winner = self.store.get(browser_id).await?.ok_or_else(|| {
                        IdentityError::Internal(
                            "identity disappeared after conflicting create".to_string(),
                        )
                    })?;
                    Ok((winner, Outcome::Conflict))
                }
            },
        }
    }

    fn generate(&self, browser_id: &str) -> NewIdentity {
        let (username, color) = match &self.seeded_rng {
            Some(rng) => {
                let mut rng = match rng.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                (generate_username(&mut *rng), generate_color(&mut *rng))
            }
            None => {
                let mut rng = rand::thread_rng();
                (generate_username(&mut rng), generate_color(&mut rng))
            }
        };

        NewIdentity {
            browser_id: browser_id.to_string(),
            username,
            color,
        }
    }
}

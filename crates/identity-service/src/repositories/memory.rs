//! In-memory identity store.
//!
//! Backs the service in local development (`STORE_BACKEND=memory`) and in
//! tests. Beyond the `IdentityStore` contract it counts writes, can be told
//! to fail every operation, and can hold the first N reads at a barrier so
//! concurrent first contacts deterministically all miss.

use crate::errors::IdentityError;
use crate::models::{Identity, NewIdentity};
use crate::repositories::{CreateOutcome, IdentityStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Barrier, RwLock};

/// Barrier applied to the first `parties` reads.
struct ReadBarrier {
    barrier: Arc<Barrier>,
    parties: usize,
    reads: AtomicUsize,
}

/// Process-local identity store.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    documents: RwLock<HashMap<String, Identity>>,
    writes: AtomicUsize,
    return_error: bool,
    read_barrier: Option<ReadBarrier>,
}

impl InMemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose every operation fails with a store error.
    pub fn failing() -> Self {
        Self {
            return_error: true,
            ..Self::default()
        }
    }

    /// Create a store whose first `parties` reads wait for each other
    /// before returning. Later reads are not held.
    pub fn with_read_barrier(parties: usize) -> Self {
        Self {
            read_barrier: Some(ReadBarrier {
                barrier: Arc::new(Barrier::new(parties)),
                parties,
                reads: AtomicUsize::new(0),
            }),
            ..Self::default()
        }
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.return_error {
            return Err(IdentityError::Store(
                "In-memory store unavailable".to_string(),
            ));
        }
        Ok(())
    }

    async fn wait_at_barrier(&self) {
        if let Some(gate) = &self.read_barrier {
            let index = gate.reads.fetch_add(1, Ordering::SeqCst);
            if index < gate.parties {
                gate.barrier.wait().await;
            }
        }
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get(&self, browser_id: &str) -> Result<Option<Identity>, IdentityError> {
        self.check_available()?;

        let found = self.documents.read().await.get(browser_id).cloned();
        self.wait_at_barrier().await;

        Ok(found)
    }

    async fn set(&self, record: &NewIdentity) -> Result<Identity, IdentityError> {
        self.check_available()?;

        let identity = record.clone().into_identity(Utc::now());
        self.documents
            .write()
            .await
            .insert(record.browser_id.clone(), identity.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(identity)
    }

    async fn create_if_absent(
        &self,
        record: &NewIdentity,
    ) -> Result<CreateOutcome, IdentityError> {
        self.check_available()?;

        let mut documents = self.documents.write().await;
        if documents.contains_key(&record.browser_id) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let identity = record.clone().into_identity(Utc::now());
        documents.insert(record.browser_id.clone(), identity.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(CreateOutcome::Created(identity))
    }

    async fn ping(&self) -> Result<(), IdentityError> {
        self.check_available()
    }
}

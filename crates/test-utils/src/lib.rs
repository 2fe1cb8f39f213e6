//! In-memory name system for testing.
//!
//! Device seeds are the SHA-256 of the device name, key pairs are Ed25519 keys from the seed and
//! an instance's key is the hex of its public key. Published documents are kept per instance key
//! and shared by every instance opened from the same name system.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use dashmap::DashMap;
use hypns_did::keys::{ed25519, KeyPair};
use hypns_did::manager::{NameInstance, NameSystem};
use hypns_did::DidDocument;
use sha2::{Digest, Sha256};

/// Step of the publish flow to fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Failure {
    /// Fail seed retrieval for the device itself.
    DeviceSeed,
    /// Fail seed retrieval for service names (`<device>.<service>.<index>`).
    ServiceSeed,
    /// Fail every publish.
    Publish,
}

/// Name system keeping published documents in memory.
#[derive(Clone, Debug, Default)]
pub struct NameSystemStore {
    documents: Arc<DashMap<String, Vec<DidDocument>>>,
    failure: Option<Failure>,
}

impl NameSystemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that fails at the given step.
    #[must_use]
    pub fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    /// Every document published to an instance, oldest first.
    #[must_use]
    pub fn published(&self, key: &str) -> Vec<DidDocument> {
        self.documents.get(key).map(|docs| docs.clone()).unwrap_or_default()
    }

    fn fails(&self, failure: Failure) -> bool {
        self.failure == Some(failure)
    }
}

impl NameSystem for NameSystemStore {
    type Instance = Instance;

    async fn device_seed(&self, name: &str) -> Result<Vec<u8>> {
        let is_service = name.contains('.');
        if (is_service && self.fails(Failure::ServiceSeed))
            || (!is_service && self.fails(Failure::DeviceSeed))
        {
            return Err(anyhow!("no seed for {name}"));
        }
        Ok(Sha256::digest(name.as_bytes()).to_vec())
    }

    async fn keypair(&self, seed: &[u8]) -> Result<KeyPair> {
        Ok(ed25519::keys_from_seed(seed)?)
    }

    async fn open(&self, keypair: &KeyPair) -> Result<Instance> {
        Ok(Instance {
            key: hex::encode(&keypair.public_key),
            store: self.clone(),
        })
    }
}

/// Instance opened from a [`NameSystemStore`].
#[derive(Clone, Debug)]
pub struct Instance {
    key: String,
    store: NameSystemStore,
}

impl NameInstance for Instance {
    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    async fn latest(&self) -> Result<Option<DidDocument>> {
        Ok(self.store.documents.get(&self.key).and_then(|docs| docs.last().cloned()))
    }

    async fn publish(&self, document: &DidDocument) -> Result<()> {
        if self.store.fails(Failure::Publish) {
            return Err(anyhow!("publish to {} failed", self.key));
        }
        self.store.documents.entry(self.key.clone()).or_default().push(document.clone());
        Ok(())
    }

    fn key(&self) -> String {
        self.key.clone()
    }
}

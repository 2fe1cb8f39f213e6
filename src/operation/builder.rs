//! Construction of signed, hash-linked operations.
//!
//! `create` roots a chain; every later operation names the suffix of the DID and the hash of the
//! operation it follows. Create and update are signed with the `#primary` key, recover and delete
//! with the `#recovery` key.

use serde::Serialize;

use crate::codec;
use crate::document::{DidDocument, Patch, VerificationMethod};
use crate::error::Err;
use crate::keys::KeyPair;
use crate::operation::{
    unique_suffix, DeletePayload, Operation, OperationHeader, OperationType, RecoverPayload,
    UpdatePayload,
};
use crate::suite::{self, SuiteRegistry};
use crate::{tracerr, Result};

/// Fragment of the key that signs create and update operations.
pub const PRIMARY_FRAGMENT: &str = "#primary";

/// Fragment of the key that signs recover and delete operations.
pub const RECOVERY_FRAGMENT: &str = "#recovery";

/// Builds operations for one DID method.
#[derive(Debug)]
pub struct OperationBuilder<'a> {
    method: String,
    registry: &'a SuiteRegistry,
}

impl<'a> OperationBuilder<'a> {
    /// Create a builder for a DID method (e.g. `hypns`, with or without the `did:` prefix) that
    /// signs with the suites in `registry`.
    #[must_use]
    pub fn new(method: impl Into<String>, registry: &'a SuiteRegistry) -> Self {
        let method: String = method.into();
        let method = method.strip_prefix("did:").unwrap_or(&method).to_string();
        Self { method, registry }
    }

    /// The DID for a unique suffix: `did:<method>:<suffix>`.
    #[must_use]
    pub fn did(&self, suffix: &str) -> String {
        format!("did:{}:{suffix}", self.method)
    }

    /// Build the create operation for a document. The DID's unique suffix is the hash of the
    /// encoded document.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidKey` - the key cannot sign.
    /// * `Err::UnsupportedAlgorithm` - no suite is registered for the key's algorithm.
    pub fn create(&self, document: &DidDocument, primary: &KeyPair) -> Result<Operation> {
        let op = self.sign(OperationType::Create, PRIMARY_FRAGMENT.to_string(), document, primary)?;
        tracing::debug!("built create operation for {}", self.did(&op.hash()?));
        Ok(op)
    }

    /// Build an update carrying the structural diff from `old` to `new`.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - `previous` is not a valid operation.
    /// * `Err::InvalidKey` / `Err::UnsupportedAlgorithm` - the key cannot sign.
    pub fn update(
        &self, previous: &Operation, old: &DidDocument, new: &DidDocument, primary: &KeyPair,
    ) -> Result<Operation> {
        self.update_with(previous, vec![Patch::diff(old, new)?], primary)
    }

    /// Build an update adding a single public key.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - `previous` is not a valid operation.
    /// * `Err::InvalidKey` / `Err::UnsupportedAlgorithm` - the key cannot sign.
    pub fn add_key(
        &self, previous: &Operation, key: VerificationMethod, primary: &KeyPair,
    ) -> Result<Operation> {
        let patch = Patch::AddPublicKeys {
            public_keys: vec![key],
        };
        self.update_with(previous, vec![patch], primary)
    }

    /// Build an update removing a single public key by id.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - `previous` is not a valid operation.
    /// * `Err::InvalidKey` / `Err::UnsupportedAlgorithm` - the key cannot sign.
    pub fn remove_key(
        &self, previous: &Operation, id: &str, primary: &KeyPair,
    ) -> Result<Operation> {
        let patch = Patch::RemovePublicKeys {
            ids: vec![id.to_string()],
        };
        self.update_with(previous, vec![patch], primary)
    }

    /// Build an update from explicit patches.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - `previous` is not a valid operation.
    /// * `Err::InvalidKey` / `Err::UnsupportedAlgorithm` - the key cannot sign.
    pub fn update_with(
        &self, previous: &Operation, patches: Vec<Patch>, primary: &KeyPair,
    ) -> Result<Operation> {
        let (suffix, previous_operation_hash) = link(previous)?;
        let kid = format!("{}{PRIMARY_FRAGMENT}", self.did(&suffix));
        let payload = UpdatePayload {
            did_unique_suffix: suffix,
            previous_operation_hash,
            patches,
        };
        let op = self.sign(OperationType::Update, kid, &payload, primary)?;
        tracing::debug!("built update operation {}", op.hash()?);
        Ok(op)
    }

    /// Build a recover operation replacing the whole document.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - `previous` is not a valid operation.
    /// * `Err::InvalidKey` / `Err::UnsupportedAlgorithm` - the key cannot sign.
    pub fn recover(
        &self, previous: &Operation, new_document: &DidDocument, recovery: &KeyPair,
    ) -> Result<Operation> {
        let (suffix, previous_operation_hash) = link(previous)?;
        let kid = format!("{}{RECOVERY_FRAGMENT}", self.did(&suffix));
        let payload = RecoverPayload {
            did_unique_suffix: suffix,
            previous_operation_hash,
            new_did_document: new_document.clone(),
        };
        let op = self.sign(OperationType::Recover, kid, &payload, recovery)?;
        tracing::debug!("built recover operation {}", op.hash()?);
        Ok(op)
    }

    /// Build a delete operation.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - `previous` is not a valid operation.
    /// * `Err::InvalidKey` / `Err::UnsupportedAlgorithm` - the key cannot sign.
    pub fn delete(&self, previous: &Operation, recovery: &KeyPair) -> Result<Operation> {
        let (suffix, previous_operation_hash) = link(previous)?;
        let kid = format!("{}{RECOVERY_FRAGMENT}", self.did(&suffix));
        let payload = DeletePayload {
            did_unique_suffix: suffix,
            previous_operation_hash,
        };
        let op = self.sign(OperationType::Delete, kid, &payload, recovery)?;
        tracing::debug!("built delete operation {}", op.hash()?);
        Ok(op)
    }

    fn sign(
        &self, operation: OperationType, kid: String, payload: &impl Serialize, key: &KeyPair,
    ) -> Result<Operation> {
        let Some(alg) = key.curve.algorithm() else {
            tracerr!(Err::InvalidKey, "{:?} keys cannot sign operations", key.curve);
        };
        let header = OperationHeader { operation, kid, alg };

        let protected = codec::encode(&header)?;
        let payload = codec::encode(payload)?;
        let digest = suite::signing_input(&protected, &payload);
        let signature = self.registry.sign(&digest, &key.private_key, alg)?;

        Ok(Operation {
            protected,
            payload,
            signature,
        })
    }
}

// Suffix of the DID and hash of the operation a new operation follows.
fn link(previous: &Operation) -> Result<(String, String)> {
    Ok((unique_suffix(previous)?, previous.hash()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::ed25519;
    use crate::operation::Payload;

    #[test]
    fn create_header() {
        let registry = SuiteRegistry::with_defaults();
        let builder = OperationBuilder::new("did:hypns", &registry);
        let primary = ed25519::generate();

        let op = builder.create(&DidDocument::default(), &primary).expect("should create");
        let header = op.header().expect("should decode header");
        assert_eq!(header.operation, OperationType::Create);
        assert_eq!(header.kid, "#primary");
        assert_eq!(header.alg.to_string(), "EdDSA");
        assert!(op.verify(&primary.public_key, &registry));
        assert!(!op.verify(&ed25519::generate().public_key, &registry));
    }

    #[test]
    fn linked_operations() {
        let registry = SuiteRegistry::with_defaults();
        let builder = OperationBuilder::new("hypns", &registry);
        let primary = ed25519::generate();
        let recovery = ed25519::generate();

        let create = builder.create(&DidDocument::default(), &primary).expect("should create");
        let suffix = unique_suffix(&create).expect("should extract suffix");

        let update = builder.remove_key(&create, "#old", &primary).expect("should update");
        let header = update.header().expect("should decode header");
        assert_eq!(header.kid, format!("did:hypns:{suffix}#primary"));
        let Payload::Update(payload) = update.payload().expect("should decode payload") else {
            panic!("expected update payload");
        };
        assert_eq!(payload.did_unique_suffix, suffix);
        assert_eq!(payload.previous_operation_hash, create.hash().expect("should hash"));

        let delete = builder.delete(&update, &recovery).expect("should delete");
        let header = delete.header().expect("should decode header");
        assert_eq!(header.kid, format!("did:hypns:{suffix}#recovery"));
        assert_eq!(unique_suffix(&delete).expect("should extract suffix"), suffix);
    }

    #[test]
    fn key_agreement_keys_cannot_sign() {
        let registry = SuiteRegistry::with_defaults();
        let builder = OperationBuilder::new("hypns", &registry);
        let x25519 = ed25519::to_x25519(&ed25519::generate()).expect("should convert");

        let err = builder.create(&DidDocument::default(), &x25519).expect_err("should reject");
        assert!(err.is(Err::InvalidKey));
    }

    #[test]
    fn empty_registry_fails_closed() {
        let registry = SuiteRegistry::new();
        let builder = OperationBuilder::new("hypns", &registry);
        let err = builder
            .create(&DidDocument::default(), &ed25519::generate())
            .expect_err("should reject");
        assert!(err.is(Err::UnsupportedAlgorithm));
    }
}

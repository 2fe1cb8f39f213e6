//! Mapping between a wallet keyring and the DID document it publishes.

use crate::document::verification_method::{USAGE_RECOVERY, USAGE_SIGNING};
use crate::document::{DidDocument, VerificationMethod, VmRelationship, DID_CONTEXT};
use crate::wallet::{KeyEntry, KeyRecord, Wallet};

/// Build the DID document for a wallet.
///
/// Key agreement records are embedded under `keyAgreement`. Every other key is published in both
/// `publicKey` and `verificationMethod`, with usage `recovery` when its fragment ends in
/// `recovery` and `signing` otherwise, and its id is listed in `authentication`,
/// `assertionMethod`, `capabilityDelegation` and `capabilityInvocation`. Mnemonics are not
/// published.
#[must_use]
pub fn to_did_document(wallet: &Wallet) -> DidDocument {
    let mut doc = DidDocument {
        context: vec![DID_CONTEXT.to_string()],
        ..DidDocument::default()
    };

    for wk in wallet.keys() {
        match &wk.record {
            KeyRecord::KeyAgreement(key) => {
                let vm = verification_method(&wk.id, key, USAGE_SIGNING);
                doc.key_agreement.push(VmRelationship::Embedded(vm));
            }
            KeyRecord::Signing(key) => {
                let usage = if key.fragment.as_deref().is_some_and(|f| f.ends_with("recovery")) {
                    USAGE_RECOVERY
                } else {
                    USAGE_SIGNING
                };
                let vm = verification_method(&wk.id, key, usage);
                let rel = VmRelationship::from(&vm);
                doc.authentication.push(rel.clone());
                doc.assertion_method.push(rel.clone());
                doc.capability_delegation.push(rel.clone());
                doc.capability_invocation.push(rel);
                doc.public_key.push(vm.clone());
                doc.verification_method.push(vm);
            }
            KeyRecord::Mnemonic(_) => {}
        }
    }

    tracing::debug!("mapped {} wallet keys to a DID document", wallet.len());
    doc
}

fn verification_method(id: &str, key: &KeyEntry, usage: &str) -> VerificationMethod {
    VerificationMethod {
        id: key.fragment.clone().unwrap_or_else(|| format!("#{id}")),
        type_: key.curve.suite().to_string(),
        usage: Some(usage.to_string()),
        public_key_hex: Some(hex::encode(&key.public_key)),
        ..VerificationMethod::default()
    }
}

/// Once a DID is known, give every key lacking a fragment one derived from its synthetic id and
/// append the fully-qualified alias `did + fragment`, so keys can be found by DID-qualified id.
/// Repeating the call with the same DID is a no-op.
pub fn qualify(did: &str, wallet: &mut Wallet) {
    wallet.qualify(did);
}

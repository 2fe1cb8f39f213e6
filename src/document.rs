//! # DID Document
//!
//! The DID document model produced from a wallet and carried by create and recover operations.
//! Lists that are empty are omitted when serialized. Field order is fixed by the struct so that
//! encoding a document is reproducible.

pub mod patch;
pub mod qualify;
pub mod verification_method;

use serde::{Deserialize, Serialize};

pub use self::patch::Patch;
pub use self::qualify::{add_controller, fully_qualify, transform_document};
pub use self::verification_method::{VerificationMethod, VmRelationship};
use self::verification_method::fragment;

/// JSON-LD context of DID documents.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// DID document.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DidDocument {
    /// JSON-LD context.
    #[serde(rename = "@context", skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,

    /// The DID the document describes, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Public keys.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub public_key: Vec<VerificationMethod>,

    /// Verification methods. Mirrors `publicKey` for wallet-derived documents.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,

    /// Authentication relationship.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<VmRelationship>,

    /// Assertion method relationship.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<VmRelationship>,

    /// Capability delegation relationship.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<VmRelationship>,

    /// Capability invocation relationship.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<VmRelationship>,

    /// Key agreement keys, usually embedded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_agreement: Vec<VmRelationship>,

    /// Service endpoints.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

impl DidDocument {
    /// Find the public key a key id refers to. Ids are compared by fragment so that `#primary`
    /// and `did:<method>:<suffix>#primary` resolve to the same key.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&VerificationMethod> {
        let wanted = fragment(kid);
        self.public_key
            .iter()
            .chain(&self.verification_method)
            .find(|vm| vm.fragment() == wanted)
    }
}

/// A service endpoint published in a DID document.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    /// Service id, e.g. `did:hypns:<key>#merkle-root`.
    pub id: String,
    /// Service type, e.g. `LinkedDomains`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Endpoint URI, e.g. `hypns://<key>`.
    pub service_endpoint: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_lists_are_omitted() {
        let doc = DidDocument {
            context: vec![DID_CONTEXT.to_string()],
            ..DidDocument::default()
        };
        let value = serde_json::to_value(&doc).expect("should serialize");
        assert_eq!(value, json!({"@context": [DID_CONTEXT]}));
    }

    #[test]
    fn find_key_by_fragment() {
        let doc: DidDocument = serde_json::from_value(json!({
            "@context": [DID_CONTEXT],
            "publicKey": [
                {"id": "#primary", "type": "Ed25519VerificationKey2018", "publicKeyHex": "01"},
                {"id": "#recovery", "type": "Ed25519VerificationKey2018", "publicKeyHex": "02"}
            ]
        }))
        .expect("should deserialize");

        let key = doc.find_key("did:hypns:abc#recovery").expect("should find key");
        assert_eq!(key.public_key_hex.as_deref(), Some("02"));
        assert!(doc.find_key("#attestation").is_none());
    }
}

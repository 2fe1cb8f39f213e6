//! Verification methods allow public keys to be associated with a DID.

use serde::{Deserialize, Serialize};

use crate::keys::{Jwk, KeyMaterial};
use crate::error::Err;
use crate::{tracerr, Result};

/// Key usage published with keys derived from a wallet: `signing` or `recovery`.
pub const USAGE_SIGNING: &str = "signing";

/// Usage of keys whose fragment ends in `recovery`.
pub const USAGE_RECOVERY: &str = "recovery";

/// A DID document can express verification methods, such as cryptographic public keys, which can be
/// used to authenticate or authorize interactions with the DID subject or associated parties.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationMethod {
    /// Identifier for the verification method. Either a relative `#fragment` or a fully qualified
    /// `did:<method>:<suffix>#fragment`.
    pub id: String,
    /// The type of verification method, e.g. `Ed25519VerificationKey2018`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Identifier for the controller of the verification method. A DID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// Key usage (`signing` or `recovery`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Hex-encoded public key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_hex: Option<String>,
    /// Base58-encoded public key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
    /// Public key as a JWK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Jwk>,
}

impl VerificationMethod {
    /// The fragment part of the id (after the last `#`), or the whole id when it has none.
    #[must_use]
    pub fn fragment(&self) -> &str {
        fragment(&self.id)
    }

    /// Public key material published by this method, in whichever encoding it uses.
    ///
    /// # Errors
    ///
    /// * `Err::KeyNotFound` - the method carries no public key.
    pub fn key_material(&self) -> Result<KeyMaterial> {
        if let Some(hex) = &self.public_key_hex {
            return Ok(KeyMaterial::Hex(hex.clone()));
        }
        if let Some(base58) = &self.public_key_base58 {
            return Ok(KeyMaterial::Base58(base58.clone()));
        }
        if let Some(jwk) = &self.public_key_jwk {
            return Ok(KeyMaterial::Jwk(jwk.clone()));
        }
        tracerr!(Err::KeyNotFound, "verification method {} has no public key", self.id)
    }

    /// Raw public key bytes.
    ///
    /// # Errors
    ///
    /// * `Err::KeyNotFound` - the method carries no public key.
    /// * `Err::InvalidFormat` / `Err::InvalidKey` - the key material is malformed.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        self.key_material()?.to_bytes()
    }
}

/// The fragment part of a DID URL (after the last `#`), or the input when it has none.
#[must_use]
pub fn fragment(id: &str) -> &str {
    id.rsplit_once('#').map_or(id, |(_, frag)| frag)
}

/// A reference to a verification method or an embedded verification method object, as used by the
/// `authentication` and other relationship fields of a [`crate::document::DidDocument`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VmRelationship {
    /// Key identifier referring to a verification method elsewhere in the document.
    KeyId(String),
    /// Embedded verification method.
    Embedded(VerificationMethod),
}

impl VmRelationship {
    /// Id of the referenced or embedded method.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::KeyId(id) => id,
            Self::Embedded(vm) => &vm.id,
        }
    }
}

/// Only picks up the id of the verification method; the method itself is not embedded.
impl From<&VerificationMethod> for VmRelationship {
    fn from(vm: &VerificationMethod) -> Self {
        Self::KeyId(vm.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn relationship_forms() {
        let rels: Vec<VmRelationship> = serde_json::from_value(json!([
            "#primary",
            {"id": "#keyAgreement", "type": "X25519KeyAgreementKey2019", "publicKeyHex": "00"}
        ]))
        .expect("should deserialize");

        assert_eq!(rels[0], VmRelationship::KeyId("#primary".to_string()));
        let VmRelationship::Embedded(vm) = &rels[1] else {
            panic!("expected embedded method");
        };
        assert_eq!(vm.fragment(), "keyAgreement");
        assert_eq!(rels[1].id(), "#keyAgreement");

        let round = serde_json::to_value(&rels).expect("should serialize");
        assert_eq!(round[0], json!("#primary"));
        assert_eq!(round[1]["publicKeyHex"], json!("00"));
    }

    #[test]
    fn key_material_preference() {
        let vm = VerificationMethod {
            id: "did:hypns:abc#primary".to_string(),
            public_key_base58: Some(bs58::encode([1u8, 2, 3]).into_string()),
            ..VerificationMethod::default()
        };
        assert_eq!(vm.fragment(), "primary");
        assert_eq!(vm.public_key_bytes().expect("should decode"), vec![1, 2, 3]);

        let empty = VerificationMethod::default();
        let err = empty.public_key_bytes().expect_err("should have no key");
        assert!(err.is(Err::KeyNotFound));
    }
}

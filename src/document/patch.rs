//! Patches carried by update operations and their replay against a DID document.
//!
//! Three actions are understood:
//!
//! * `ietf-json-patch` - an RFC 6902 structural diff applied to the serialized document.
//! * `add-public-keys` - appends keys to `publicKey` and `verificationMethod` and references them
//!   from the common relationships. A key whose id already exists replaces it.
//! * `remove-public-keys` - removes keys by id from the key lists and from every relationship.

use serde::{Deserialize, Serialize};

use crate::document::verification_method::fragment;
use crate::document::{DidDocument, VerificationMethod, VmRelationship};
use crate::Result;

/// A single patch of an update operation, tagged by its `action`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Patch {
    /// Structural JSON Patch between two documents.
    IetfJsonPatch {
        /// The patch operations.
        patches: json_patch::Patch,
    },

    /// Add one or more public keys.
    #[serde(rename_all = "camelCase")]
    AddPublicKeys {
        /// Keys to add.
        public_keys: Vec<VerificationMethod>,
    },

    /// Remove one or more public keys by id.
    RemovePublicKeys {
        /// Ids (or fragments) of the keys to remove.
        ids: Vec<String>,
    },
}

impl Patch {
    /// Structural diff turning `old` into `new`.
    ///
    /// # Errors
    ///
    /// * Serialization error if either document cannot be serialized.
    pub fn diff(old: &DidDocument, new: &DidDocument) -> Result<Self> {
        let old = serde_json::to_value(old)?;
        let new = serde_json::to_value(new)?;
        Ok(Self::IetfJsonPatch {
            patches: json_patch::diff(&old, &new),
        })
    }
}

impl DidDocument {
    /// Apply patches in order. The document is left untouched if any patch fails.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidPatch` - a JSON patch does not apply to the document.
    /// * Deserialization error if the patched document is no longer a DID document.
    pub fn apply_patches(&mut self, patches: &[Patch]) -> Result<()> {
        let mut patched = self.clone();
        for p in patches {
            match p {
                Patch::IetfJsonPatch { patches } => {
                    let mut value = serde_json::to_value(&patched)?;
                    json_patch::patch(&mut value, &patches.0)?;
                    patched = serde_json::from_value(value)?;
                }
                Patch::AddPublicKeys { public_keys } => patched.add_keys(public_keys),
                Patch::RemovePublicKeys { ids } => patched.remove_keys(ids),
            }
        }
        *self = patched;
        Ok(())
    }

    fn add_keys(&mut self, keys: &[VerificationMethod]) {
        let ids: Vec<String> = keys.iter().map(|k| k.id.clone()).collect();
        self.remove_keys(&ids);

        for key in keys {
            self.public_key.push(key.clone());
            self.verification_method.push(key.clone());
            for rel in self.common_relationships_mut() {
                rel.push(VmRelationship::from(key));
            }
        }
    }

    fn remove_keys(&mut self, ids: &[String]) {
        let removed = |id: &str| ids.iter().any(|r| fragment(r) == fragment(id));

        self.public_key.retain(|k| !removed(&k.id));
        self.verification_method.retain(|k| !removed(&k.id));
        for rel in self.common_relationships_mut() {
            rel.retain(|r| !removed(r.id()));
        }
        self.key_agreement.retain(|r| !removed(r.id()));
    }

    // authentication, assertionMethod, capabilityDelegation and capabilityInvocation share the
    // same key ids
    fn common_relationships_mut(&mut self) -> [&mut Vec<VmRelationship>; 4] {
        [
            &mut self.authentication,
            &mut self.assertion_method,
            &mut self.capability_delegation,
            &mut self.capability_invocation,
        ]
    }
}

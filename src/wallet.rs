//! # Wallet
//!
//! The local keyring of an identity. Records are a closed set of variants: signing keys, key
//! agreement keys and mnemonics. Each record is stored under a synthetic id derived from its
//! content so the same key always gets the same id.
//!
//! A wallet is owned by a single identity session. Mutation is not synchronized; callers that
//! share a wallet must serialize access themselves.

pub mod mapper;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::document::verification_method::fragment;
use crate::error::Err;
use crate::keys::{Curve, KeyMaterial, KeyPair};
use crate::{tracerr, Result};

/// A key held by the wallet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEntry {
    /// Curve of the key.
    pub curve: Curve,
    /// Raw public key bytes.
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    /// Raw private key bytes. Empty for imported public keys.
    #[serde(with = "hex_bytes")]
    pub private_key: Vec<u8>,
    /// Local fragment id such as `#primary`.
    pub fragment: Option<String>,
    /// Fully-qualified ids the key is known by once a DID is assigned.
    pub aliases: Vec<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl KeyEntry {
    /// Entry for a key pair.
    #[must_use]
    pub fn new(keypair: &KeyPair) -> Self {
        Self {
            curve: keypair.curve,
            public_key: keypair.public_key.clone(),
            private_key: keypair.private_key.clone(),
            fragment: None,
            aliases: Vec::new(),
            notes: None,
        }
    }

    /// Entry for an imported public key, decoded once from its external encoding.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidFormat` / `Err::InvalidKey` - the key material is malformed.
    pub fn from_material(curve: Curve, material: &KeyMaterial) -> Result<Self> {
        Ok(Self {
            curve,
            public_key: material.to_bytes()?,
            private_key: Vec::new(),
            fragment: None,
            aliases: Vec::new(),
            notes: None,
        })
    }

    /// Set the local fragment id.
    #[must_use]
    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The key as a key pair.
    #[must_use]
    pub fn keypair(&self) -> KeyPair {
        KeyPair {
            curve: self.curve,
            public_key: self.public_key.clone(),
            private_key: self.private_key.clone(),
        }
    }

    fn matches(&self, id: &str) -> bool {
        self.fragment.as_deref() == Some(id) || self.aliases.iter().any(|a| a == id)
    }
}

/// A mnemonic held by the wallet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MnemonicEntry {
    /// The mnemonic phrase.
    pub mnemonic: String,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// A wallet record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum KeyRecord {
    /// A key published as a verification method.
    Signing(KeyEntry),
    /// A key published under `keyAgreement`.
    KeyAgreement(KeyEntry),
    /// A mnemonic. Never published.
    Mnemonic(MnemonicEntry),
}

impl KeyRecord {
    /// Synthetic id: the first 16 hex characters of the SHA-256 of the public key (or mnemonic).
    #[must_use]
    pub fn id(&self) -> String {
        let digest = match self {
            Self::Signing(key) | Self::KeyAgreement(key) => codec::sha256(&key.public_key),
            Self::Mnemonic(m) => codec::sha256(m.mnemonic.as_bytes()),
        };
        hex::encode(&digest[..8])
    }

    /// The key entry, for key records.
    #[must_use]
    pub const fn key(&self) -> Option<&KeyEntry> {
        match self {
            Self::Signing(key) | Self::KeyAgreement(key) => Some(key),
            Self::Mnemonic(_) => None,
        }
    }

    fn key_mut(&mut self) -> Option<&mut KeyEntry> {
        match self {
            Self::Signing(key) | Self::KeyAgreement(key) => Some(key),
            Self::Mnemonic(_) => None,
        }
    }
}

/// A record stored in the wallet under its synthetic id.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WalletKey {
    /// Synthetic id.
    pub id: String,
    /// The record.
    pub record: KeyRecord,
}

/// Keyring mapping synthetic ids to records, in insertion order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Wallet {
    keys: Vec<WalletKey>,
}

impl Wallet {
    /// Create an empty wallet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record and return its synthetic id.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidInput` - a record with the same id is already held.
    pub fn add(&mut self, record: KeyRecord) -> Result<String> {
        let id = record.id();
        if self.get(&id).is_some() {
            tracerr!(Err::InvalidInput, "wallet already holds key {id}");
        }
        tracing::debug!("adding key {id} to wallet");
        self.keys.push(WalletKey {
            id: id.clone(),
            record,
        });
        Ok(id)
    }

    /// Record held under a synthetic id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&KeyRecord> {
        self.keys.iter().find(|k| k.id == id).map(|k| &k.record)
    }

    /// All records in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &WalletKey> {
        self.keys.iter()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the wallet holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find a key by fragment (`#primary`) or by fully-qualified alias
    /// (`did:<method>:<suffix>#primary`).
    #[must_use]
    pub fn extract_by_fragment(&self, id: &str) -> Option<&KeyEntry> {
        self.keys.iter().filter_map(|k| k.record.key()).find(|key| key.matches(id))
    }

    /// Like [`Wallet::extract_by_fragment`] but a missing key is an error.
    ///
    /// # Errors
    ///
    /// * `Err::KeyNotFound` - no key has that fragment or alias.
    pub fn key(&self, id: &str) -> Result<&KeyEntry> {
        let Some(key) = self.extract_by_fragment(id) else {
            tracerr!(Err::KeyNotFound, "no wallet key for {id}");
        };
        Ok(key)
    }

    // Give every key lacking a fragment one derived from its id and record `did + fragment` as an
    // alias.
    fn qualify(&mut self, did: &str) {
        for WalletKey { id, record } in &mut self.keys {
            let Some(key) = record.key_mut() else {
                continue;
            };
            let frag = key.fragment.get_or_insert_with(|| format!("#{id}"));
            let alias = format!("{did}#{}", fragment(frag));
            if !key.aliases.contains(&alias) {
                key.aliases.push(alias);
            }
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

//! # hypns DID
//!
//! Operation construction and identity-key engine for a DID method anchored in a hypercore-style
//! name system.
//!
//! * [`keys`] derives secp256k1 keys from a mnemonic along `m/44'/60'/0'/{purpose}/{version}` and
//!   creates Ed25519 / X25519 wallet keys.
//! * [`codec`] encodes payloads as base64url JSON and identifies them by SHA2-256 multihash.
//! * [`suite`] holds the signature suites, registered explicitly by algorithm.
//! * [`operation`] builds create, update, recover and delete operations, links them by hash,
//!   validates chains and orders anchored operations.
//! * [`wallet`] and [`document`] map a wallet keyring to the DID document it publishes.
//! * [`manager`] runs the publish flow against an injected name system.

pub mod codec;
pub mod document;
pub mod error;
pub mod keys;
pub mod manager;
pub mod operation;
pub mod suite;
pub mod wallet;

pub use crate::document::{DidDocument, Service, VerificationMethod};
pub use crate::error::Error;
pub use crate::keys::{Algorithm, Curve, KeyPair};
pub use crate::manager::{DidManager, NameInstance, NameSystem, Parameters};
pub use crate::operation::{Operation, OperationBuilder, OperationHeader, OperationType};
pub use crate::suite::SuiteRegistry;
pub use crate::wallet::Wallet;

/// Result type for DID operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

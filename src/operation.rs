//! # Operations
//!
//! Signed, hash-linked records describing one step in a DID's lifecycle. An operation is three
//! base64url strings: the protected header, the payload and the signature over
//! `protected.payload`. The hash of an operation is the hash of its encoded payload; the unique
//! suffix of a DID is the hash of its create operation.

pub mod builder;
pub mod chain;
pub mod order;

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use self::builder::OperationBuilder;
pub use self::chain::validate_chain;
pub use self::order::{order, TransactionRecord};
use crate::codec;
use crate::document::{DidDocument, Patch};
use crate::error::{Err, Error};
use crate::keys::Algorithm;
use crate::suite::{self, SuiteRegistry};
use crate::{tracerr, Result};

/// Type of DID operation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Create a new DID.
    Create,
    /// Patch the current document.
    Update,
    /// Replace the whole document using the recovery key.
    Recover,
    /// Deactivate the DID.
    Delete,
}

impl Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Recover => write!(f, "recover"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "recover" => Ok(Self::Recover),
            "delete" => Ok(Self::Delete),
            _ => tracerr!(Err::UnknownOperation, "unknown operation type: {s}"),
        }
    }
}

/// Protected header of an operation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OperationHeader {
    /// Operation type.
    pub operation: OperationType,
    /// Id of the key that signed the operation.
    pub kid: String,
    /// Signature algorithm.
    pub alg: Algorithm,
}

/// Payload of an update operation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    /// Unique suffix of the DID.
    pub did_unique_suffix: String,
    /// Hash of the operation this one follows.
    pub previous_operation_hash: String,
    /// Patches to apply, in order.
    pub patches: Vec<Patch>,
}

/// Payload of a recover operation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverPayload {
    /// Unique suffix of the DID.
    pub did_unique_suffix: String,
    /// Hash of the operation this one follows.
    pub previous_operation_hash: String,
    /// Replacement document.
    pub new_did_document: DidDocument,
}

/// Payload of a delete operation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePayload {
    /// Unique suffix of the DID.
    pub did_unique_suffix: String,
    /// Hash of the operation this one follows.
    pub previous_operation_hash: String,
}

/// Decoded payload, by operation type.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// The initial document.
    Create(DidDocument),
    /// Patches to the current document.
    Update(UpdatePayload),
    /// A replacement document.
    Recover(RecoverPayload),
    /// Deactivation.
    Delete(DeletePayload),
}

impl Payload {
    /// Unique suffix stated by a non-create payload.
    #[must_use]
    pub fn did_unique_suffix(&self) -> Option<&str> {
        match self {
            Self::Create(_) => None,
            Self::Update(p) => Some(&p.did_unique_suffix),
            Self::Recover(p) => Some(&p.did_unique_suffix),
            Self::Delete(p) => Some(&p.did_unique_suffix),
        }
    }

    /// Previous operation hash stated by a non-create payload.
    #[must_use]
    pub fn previous_operation_hash(&self) -> Option<&str> {
        match self {
            Self::Create(_) => None,
            Self::Update(p) => Some(&p.previous_operation_hash),
            Self::Recover(p) => Some(&p.previous_operation_hash),
            Self::Delete(p) => Some(&p.previous_operation_hash),
        }
    }
}

/// A signed operation as transmitted.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Operation {
    /// base64url-encoded JSON header.
    pub protected: String,
    /// base64url-encoded JSON payload.
    pub payload: String,
    /// base64url-encoded signature over `protected.payload`.
    pub signature: String,
}

impl Operation {
    /// Encode the whole operation as base64url JSON, the form used in batch files.
    ///
    /// # Errors
    ///
    /// * Serialization error.
    pub fn encode(&self) -> Result<String> {
        codec::encode(self)
    }

    /// Decode an operation from its base64url JSON form.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidFormat` - not base64url.
    /// * Deserialization error if it is not an operation.
    pub fn decode(encoded: &str) -> Result<Self> {
        codec::decode(encoded)
    }

    /// Operation type named by the header. Checked before the rest of the header so that an
    /// unrecognized type is reported as such.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - the type is missing or not recognized.
    pub fn operation_type(&self) -> Result<OperationType> {
        let raw: serde_json::Value = codec::decode(&self.protected)?;
        let Some(op) = raw.get("operation").and_then(serde_json::Value::as_str) else {
            tracerr!(Err::UnknownOperation, "header has no operation type");
        };
        op.parse()
    }

    /// Decode the protected header.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - the operation type is not recognized.
    /// * Deserialization error if the header is malformed.
    pub fn header(&self) -> Result<OperationHeader> {
        self.operation_type()?;
        codec::decode(&self.protected)
    }

    /// Decode the payload according to the header's operation type.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownOperation` - the operation type is not recognized.
    /// * Deserialization error if the payload does not match its type.
    pub fn payload(&self) -> Result<Payload> {
        let payload = match self.operation_type()? {
            OperationType::Create => Payload::Create(codec::decode(&self.payload)?),
            OperationType::Update => Payload::Update(codec::decode(&self.payload)?),
            OperationType::Recover => Payload::Recover(codec::decode(&self.payload)?),
            OperationType::Delete => Payload::Delete(codec::decode(&self.payload)?),
        };
        Ok(payload)
    }

    /// Hash of the operation: the multihash of its encoded payload.
    ///
    /// # Errors
    ///
    /// * Multihash error if the digest cannot be framed.
    pub fn hash(&self) -> Result<String> {
        codec::hash_encoded(&self.payload)
    }

    /// Verify the signature with a raw public key, using the algorithm named in the header.
    /// Returns `false` for any malformed header, unregistered algorithm or bad signature.
    #[must_use]
    pub fn verify(&self, public_key: &[u8], registry: &SuiteRegistry) -> bool {
        let Ok(header) = self.header() else {
            return false;
        };
        let digest = suite::signing_input(&self.protected, &self.payload);
        registry.verify(&digest, &self.signature, public_key, header.alg)
    }
}

/// Unique suffix of the DID an operation belongs to: the hash of a create payload, or the
/// `didUniqueSuffix` stated by any other operation.
///
/// # Errors
///
/// * `Err::UnknownOperation` - the operation type is not recognized.
/// * Deserialization error if the payload is malformed.
pub fn unique_suffix(operation: &Operation) -> Result<String> {
    match operation.payload()? {
        Payload::Create(_) => operation.hash(),
        Payload::Update(p) => Ok(p.did_unique_suffix),
        Payload::Recover(p) => Ok(p.did_unique_suffix),
        Payload::Delete(p) => Ok(p.did_unique_suffix),
    }
}

/// A batch of anchored operations, each encoded with [`Operation::encode`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct BatchFile {
    /// Encoded operations.
    pub operations: Vec<String>,
}

/// An operation decoded from a batch file.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedOperation {
    /// Hash of the operation.
    pub operation_hash: String,
    /// The operation as transmitted.
    pub operation: Operation,
    /// Decoded header.
    pub header: OperationHeader,
    /// Decoded payload.
    pub payload: Payload,
}

/// Decode every operation of a batch file.
///
/// # Errors
///
/// * Any decoding error of an individual operation; the batch is rejected as a whole.
pub fn decode_batch(batch: &BatchFile) -> Result<Vec<DecodedOperation>> {
    batch
        .operations
        .iter()
        .map(|encoded| {
            let operation = Operation::decode(encoded)?;
            Ok(DecodedOperation {
                operation_hash: operation.hash()?,
                header: operation.header()?,
                payload: operation.payload()?,
                operation,
            })
        })
        .collect()
}

//! Payload encoding, content hashing and multihash framing.
//!
//! Payloads are serialized to JSON in their own field order (no canonicalization), encoded as
//! unpadded base64url, and identified by the base64url encoding of a SHA2-256 multihash computed
//! over the bytes of that encoded string. Producers must keep field order fixed to obtain
//! reproducible identifiers; the typed payloads in this crate do so by construction.

use base64ct::{Base64UrlUnpadded, Encoding};
use multihash::Multihash;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Err;
use crate::{tracerr, Result};

/// Multicodec code for SHA2-256.
pub const SHA2_256: u64 = 0x12;

/// Length in bytes of a SHA2-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Encode an object as base64url-encoded JSON.
///
/// # Errors
///
/// * Serialization error if the object cannot be serialized.
pub fn encode(data: &impl Serialize) -> Result<String> {
    let buf = serde_json::to_vec(data)?;
    Ok(Base64UrlUnpadded::encode_string(&buf))
}

/// Decode a base64url-encoded JSON object.
///
/// # Errors
///
/// * `Err::InvalidFormat` if the string is not valid base64url.
/// * Deserialization error if the decoded bytes are not the expected JSON.
pub fn decode<T: DeserializeOwned>(encoded: &str) -> Result<T> {
    let buf = Base64UrlUnpadded::decode_vec(encoded)?;
    Ok(serde_json::from_slice(&buf)?)
}

/// Hash a payload: SHA2-256 over the bytes of `encode(payload)`, wrapped in a multihash frame and
/// base64url-encoded. This is the identifier used for operation hashes and DID unique suffixes.
///
/// # Errors
///
/// * Serialization error if the payload cannot be serialized.
pub fn hash(payload: &impl Serialize) -> Result<String> {
    let encoded = encode(payload)?;
    hash_encoded(&encoded)
}

/// Hash an already encoded payload. `hash_encoded(&encode(p)?)` equals `hash(p)`.
///
/// # Errors
///
/// * Multihash error if the digest cannot be framed.
pub fn hash_encoded(encoded: &str) -> Result<String> {
    let multi = multi_hash(encoded.as_bytes())?;
    Ok(Base64UrlUnpadded::encode_string(&multi))
}

/// SHA2-256 digest of the provided bytes.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}

/// Multi-hashes the provided data using SHA2-256.
fn multi_hash(data: &[u8]) -> Result<Vec<u8>> {
    let hashed = sha256(data);
    let mhash = Multihash::<64>::wrap(SHA2_256, &hashed)?;
    Ok(mhash.to_bytes())
}

/// Parse a framed multihash and check it is a full-length SHA2-256 digest.
fn sha256_multihash(bytes: &[u8]) -> Result<Multihash<64>> {
    let wrapped = Multihash::<64>::from_bytes(bytes)?;
    if wrapped.code() != SHA2_256 {
        tracerr!(Err::InvalidHash, "invalid hash code: {:#x}", wrapped.code());
    }
    if wrapped.digest().len() != DIGEST_LEN {
        tracerr!(Err::InvalidHash, "invalid digest length: {}", wrapped.digest().len());
    }
    Ok(wrapped)
}

/// Check the provided string is a base64url-encoded SHA2-256 multihash.
///
/// # Errors
///
/// * `Err::InvalidFormat` - not base64url.
/// * `Err::InvalidHash` - not a SHA2-256 multihash.
pub fn check(hash: &str) -> Result<()> {
    let decoded = Base64UrlUnpadded::decode_vec(hash)?;
    sha256_multihash(&decoded)?;
    Ok(())
}

/// Convert a base58 SHA2-256 multihash into its fixed 32-byte hex form by stripping the 2-byte
/// multihash header. The fixed form is always lowercase hex with a `0x` prefix.
///
/// # Errors
///
/// * `Err::InvalidFormat` - not base58.
/// * `Err::InvalidHash` - not a SHA2-256 multihash.
pub fn base58_to_fixed32(base58: &str) -> Result<String> {
    let bytes = bs58::decode(base58).into_vec()?;
    let wrapped = sha256_multihash(&bytes)?;
    Ok(format!("0x{}", hex::encode(wrapped.digest())))
}

/// Convert a fixed 32-byte hex digest back into a base58 SHA2-256 multihash by re-attaching the
/// multihash header. Input may be upper or lower case, with or without the `0x` prefix, so
/// converting back with [`base58_to_fixed32`] yields the canonical lowercase `0x` form.
///
/// # Errors
///
/// * `Err::InvalidFormat` - not hex, or not exactly 32 bytes.
pub fn fixed32_to_base58(fixed: &str) -> Result<String> {
    let digest = hex::decode(fixed.strip_prefix("0x").unwrap_or(fixed))?;
    if digest.len() != DIGEST_LEN {
        tracerr!(Err::InvalidFormat, "expected {DIGEST_LEN} bytes, got {}", digest.len());
    }
    let mhash = Multihash::<64>::wrap(SHA2_256, &digest)?;
    Ok(bs58::encode(mhash.to_bytes()).into_string())
}

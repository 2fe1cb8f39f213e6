//! Cryptographic key types: curves, signing algorithms and raw key pairs, plus the ingestion of
//! externally encoded key material into a single in-memory form.

use std::fmt::Display;
use std::str::FromStr;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};

pub mod ed25519;
pub mod mnemonic;

use crate::error::{Err, Error};
use crate::{tracerr, Result};

/// Elliptic curve a key belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Curve {
    /// secp256k1, used with ECDSA.
    Secp256k1,
    /// Edwards25519, used with `EdDSA`.
    Ed25519,
    /// Curve25519 in Montgomery form, used for key agreement only.
    X25519,
}

impl Curve {
    /// Verification method type used to publish a key on this curve in a DID document.
    #[must_use]
    pub const fn suite(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "EcdsaSecp256k1VerificationKey2019",
            Self::Ed25519 => "Ed25519VerificationKey2018",
            Self::X25519 => "X25519KeyAgreementKey2019",
        }
    }

    /// Signing algorithm for keys on this curve. Key agreement curves cannot sign.
    #[must_use]
    pub const fn algorithm(&self) -> Option<Algorithm> {
        match self {
            Self::Secp256k1 => Some(Algorithm::Es256k),
            Self::Ed25519 => Some(Algorithm::EdDsa),
            Self::X25519 => None,
        }
    }

    /// Parse a verification method type into a curve.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidKey` - the suite is not one this crate knows a curve for.
    pub fn from_suite(suite: &str) -> Result<Self> {
        match suite {
            "EcdsaSecp256k1VerificationKey2019" => Ok(Self::Secp256k1),
            "Ed25519VerificationKey2018" => Ok(Self::Ed25519),
            "X25519KeyAgreementKey2019" => Ok(Self::X25519),
            _ => tracerr!(Err::InvalidKey, "unknown key suite: {suite}"),
        }
    }
}

/// Signature algorithm named in an operation header.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Algorithm {
    /// ECDSA over secp256k1 with SHA-256.
    #[serde(rename = "ES256K")]
    Es256k,
    /// Ed25519 signatures.
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Es256k => write!(f, "ES256K"),
            Self::EdDsa => write!(f, "EdDSA"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ES256K" => Ok(Self::Es256k),
            "EdDSA" => Ok(Self::EdDsa),
            _ => tracerr!(Err::UnsupportedAlgorithm, "unsupported algorithm: {s}"),
        }
    }
}

/// A raw key pair tagged with its curve.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyPair {
    /// Curve the key pair belongs to.
    pub curve: Curve,
    /// Public key bytes (compressed SEC1 for secp256k1, 32 bytes for the 25519 curves).
    pub public_key: Vec<u8>,
    /// Private key bytes (32-byte scalar or seed).
    pub private_key: Vec<u8>,
}

impl KeyPair {
    /// Hex encoding of the public key.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }

    /// Hex encoding of the private key.
    #[must_use]
    pub fn private_key_hex(&self) -> String {
        hex::encode(&self.private_key)
    }
}

/// Simplified JSON Web Key (JWK) key structure.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Jwk {
    /// Key type.
    pub kty: String,
    /// Cryptographic curve type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// X coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Y coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Secret key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl Jwk {
    /// Curve implied by the key type and curve parameters.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidKey` - the combination is not supported.
    pub fn curve(&self) -> Result<Curve> {
        match (self.kty.as_str(), self.crv.as_deref()) {
            ("EC", Some("secp256k1")) => Ok(Curve::Secp256k1),
            ("OKP", Some("Ed25519")) => Ok(Curve::Ed25519),
            ("OKP", Some("X25519")) => Ok(Curve::X25519),
            _ => tracerr!(Err::InvalidKey, "unknown key type and curve combination"),
        }
    }

    /// Raw public key bytes: compressed SEC1 for secp256k1, the `x` value for OKP keys.
    fn public_bytes(&self) -> Result<Vec<u8>> {
        let Some(x) = &self.x else {
            tracerr!(Err::InvalidKey, "missing x coordinate");
        };
        let raw_x = Base64UrlUnpadded::decode_vec(x)?;
        if raw_x.len() != 32 {
            tracerr!(Err::InvalidKey, "expected 32 byte x coordinate, got {}", raw_x.len());
        }
        if self.curve()? != Curve::Secp256k1 {
            return Ok(raw_x);
        }
        let Some(y) = &self.y else {
            tracerr!(Err::InvalidKey, "missing y coordinate");
        };
        let raw_y = Base64UrlUnpadded::decode_vec(y)?;
        let sec1 = [&[0x04], raw_x.as_slice(), raw_y.as_slice()].concat();
        let vk = k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)?;
        Ok(vk.to_encoded_point(true).as_bytes().to_vec())
    }
}

/// Key material as it arrives from outside the crate. Converted once, at ingestion, into raw bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyMaterial {
    /// Hex-encoded bytes.
    Hex(String),
    /// Base58-encoded bytes.
    Base58(String),
    /// A JSON Web Key.
    Jwk(Jwk),
}

impl KeyMaterial {
    /// Decode the material into raw public key bytes.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidFormat` - the encoding is malformed.
    /// * `Err::InvalidKey` - a JWK is incomplete or not a supported curve.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Hex(s) => Ok(hex::decode(s)?),
            Self::Base58(s) => Ok(bs58::decode(s).into_vec()?),
            Self::Jwk(jwk) => jwk.public_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_strings() {
        assert_eq!(Algorithm::Es256k.to_string(), "ES256K");
        assert_eq!("EdDSA".parse::<Algorithm>().expect("should parse"), Algorithm::EdDsa);
        let err = "HS256".parse::<Algorithm>().expect_err("should not parse");
        assert!(err.is(Err::UnsupportedAlgorithm));
        assert_eq!(
            serde_json::to_string(&Algorithm::Es256k).expect("should serialize"),
            r#""ES256K""#
        );
    }

    #[test]
    fn curve_suites() {
        for curve in [Curve::Secp256k1, Curve::Ed25519, Curve::X25519] {
            assert_eq!(Curve::from_suite(curve.suite()).expect("should parse"), curve);
        }
        assert!(Curve::X25519.algorithm().is_none());
        assert!(Curve::from_suite("RsaVerificationKey2018").is_err());
    }

    #[test]
    fn secp256k1_jwk_compresses() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            crv: Some("secp256k1".to_string()),
            x: Some("XFl4fd9n4qp2Gcc2_oqqUsI3uT63o3Jt0f54DiNOijw".to_string()),
            y: Some("IH_q19UKDu_jkIwtehWU7NiaXk7CaGoD-XRcuuqcgQ0".to_string()),
            ..Default::default()
        };
        let bytes = KeyMaterial::Jwk(jwk.clone()).to_bytes().expect("should decode");
        assert_eq!(bytes.len(), 33);
        let x = Base64UrlUnpadded::decode_vec(jwk.x.as_deref().unwrap_or_default())
            .expect("should decode");
        assert_eq!(&bytes[1..], x.as_slice());
    }

    #[test]
    fn hex_and_base58_agree() {
        let raw = vec![1u8, 2, 3, 250];
        let hexed = KeyMaterial::Hex(hex::encode(&raw)).to_bytes().expect("should decode");
        let based = KeyMaterial::Base58(bs58::encode(&raw).into_string())
            .to_bytes()
            .expect("should decode");
        assert_eq!(hexed, raw);
        assert_eq!(based, raw);
    }

    #[test]
    fn incomplete_jwk() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            crv: Some("P-256".to_string()),
            ..Default::default()
        };
        let err = KeyMaterial::Jwk(jwk).to_bytes().expect_err("should reject");
        assert!(err.is(Err::InvalidKey));
    }
}

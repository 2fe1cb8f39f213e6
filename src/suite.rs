//! Signature suites and the registry that dispatches signing and verification by algorithm.
//!
//! Operations are signed over the SHA-256 digest of the compact string
//! `encodedHeader + "." + encodedPayload`. Signatures are returned base64url-encoded. Verification
//! never fails with an error: any malformed input or bad signature yields `false`.

use std::collections::HashMap;
use std::fmt::Debug;

use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::codec;
use crate::error::Err;
use crate::keys::Algorithm;
use crate::{tracerr, Result};

/// A signing and verification strategy for one algorithm.
pub trait SignatureSuite: Debug + Send + Sync {
    /// Algorithm implemented by the suite.
    fn algorithm(&self) -> Algorithm;

    /// Sign a 32-byte digest with a raw private key, returning the raw signature bytes.
    ///
    /// # Errors
    ///
    /// An error should be returned if the private key is malformed or signing fails.
    fn sign(&self, digest: &[u8; 32], private_key: &[u8]) -> Result<Vec<u8>>;

    /// Verify raw signature bytes over a digest with a raw public key.
    fn verify(&self, digest: &[u8; 32], signature: &[u8], public_key: &[u8]) -> bool;
}

/// ECDSA over secp256k1. The digest is signed directly (no second hash); signatures are 64-byte
/// fixed-width `r || s`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Es256k;

impl SignatureSuite for Es256k {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Es256k
    }

    fn sign(&self, digest: &[u8; 32], private_key: &[u8]) -> Result<Vec<u8>> {
        let signing_key = k256::ecdsa::SigningKey::from_slice(private_key)?;
        let sig: k256::ecdsa::Signature = match signing_key.sign_prehash(digest) {
            Ok(sig) => sig,
            Err(e) => tracerr!(Err::SigningError, "failed to sign digest: {e}"),
        };
        Ok(sig.to_bytes().to_vec())
    }

    fn verify(&self, digest: &[u8; 32], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(verifying_key) = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = k256::ecdsa::Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify_prehash(digest, &sig).is_ok()
    }
}

/// Ed25519 over the digest bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdDsa;

impl SignatureSuite for EdDsa {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDsa
    }

    fn sign(&self, digest: &[u8; 32], private_key: &[u8]) -> Result<Vec<u8>> {
        let Ok(secret) = <[u8; 32]>::try_from(private_key) else {
            tracerr!(Err::InvalidKey, "Ed25519 private key must be 32 bytes");
        };
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&secret);
        Ok(signing_key.sign(digest).to_bytes().to_vec())
    }

    fn verify(&self, digest: &[u8; 32], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(public) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(&public) else {
            return false;
        };
        let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(digest, &sig).is_ok()
    }
}

/// Registry mapping algorithms to suites. Constructed explicitly and passed by reference to the
/// components that sign or verify.
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: HashMap<Algorithm, Box<dyn SignatureSuite>>,
}

impl SuiteRegistry {
    /// Create an empty registry. Every algorithm fails closed until a suite is registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `ES256K` and `EdDSA` suites registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Es256k);
        registry.register(EdDsa);
        registry
    }

    /// Register a suite, replacing any suite previously registered for its algorithm.
    pub fn register(&mut self, suite: impl SignatureSuite + 'static) {
        self.suites.insert(suite.algorithm(), Box::new(suite));
    }

    /// Algorithms with a registered suite.
    #[must_use]
    pub fn algorithms(&self) -> Vec<Algorithm> {
        self.suites.keys().copied().collect()
    }

    fn suite(&self, alg: Algorithm) -> Result<&dyn SignatureSuite> {
        match self.suites.get(&alg) {
            Some(suite) => Ok(suite.as_ref()),
            None => tracerr!(Err::UnsupportedAlgorithm, "no suite registered for {alg}"),
        }
    }

    /// Sign a digest and return the base64url-encoded signature.
    ///
    /// # Errors
    ///
    /// * `Err::UnsupportedAlgorithm` - no suite is registered for `alg`.
    /// * `Err::InvalidKey` / `Err::SigningError` - the suite could not sign.
    pub fn sign(&self, digest: &[u8; 32], private_key: &[u8], alg: Algorithm) -> Result<String> {
        let sig = self.suite(alg)?.sign(digest, private_key)?;
        Ok(Base64UrlUnpadded::encode_string(&sig))
    }

    /// Verify a base64url-encoded signature over a digest. Returns `false` for unregistered
    /// algorithms, malformed input and bad signatures.
    #[must_use]
    pub fn verify(
        &self, digest: &[u8; 32], signature: &str, public_key: &[u8], alg: Algorithm,
    ) -> bool {
        let Some(suite) = self.suites.get(&alg) else {
            tracing::debug!("no suite registered for {alg}");
            return false;
        };
        let Ok(sig) = Base64UrlUnpadded::decode_vec(signature) else {
            return false;
        };
        suite.verify(digest, &sig, public_key)
    }
}

/// Digest signed for an operation: SHA-256 of `encoded_header.encoded_payload`.
#[must_use]
pub fn signing_input(encoded_header: &str, encoded_payload: &str) -> [u8; 32] {
    codec::sha256(format!("{encoded_header}.{encoded_payload}").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::ed25519;
    use crate::keys::mnemonic::{generate_mnemonic, MnemonicKeySystem, Purpose};

    #[test]
    fn es256k_sign_verify() {
        let mnemonic = generate_mnemonic().expect("should generate mnemonic");
        let mks = MnemonicKeySystem::new(&mnemonic).expect("should create key system");
        let key = mks.key_for_purpose(Purpose::Primary, 0).expect("should derive key");
        let other = mks.key_for_purpose(Purpose::Recovery, 0).expect("should derive key");

        let registry = SuiteRegistry::with_defaults();
        let digest = signing_input("aGVhZGVy", "cGF5bG9hZA");
        let sig = registry.sign(&digest, &key.private_key, Algorithm::Es256k).expect("should sign");

        assert!(registry.verify(&digest, &sig, &key.public_key, Algorithm::Es256k));
        assert!(!registry.verify(&digest, &sig, &other.public_key, Algorithm::Es256k));

        let tampered = signing_input("aGVhZGVy", "cGF5bG9hZB");
        assert!(!registry.verify(&tampered, &sig, &key.public_key, Algorithm::Es256k));
    }

    #[test]
    fn eddsa_sign_verify() {
        let key = ed25519::generate();
        let registry = SuiteRegistry::with_defaults();
        let digest = codec::sha256(b"message");
        let sig = registry.sign(&digest, &key.private_key, Algorithm::EdDsa).expect("should sign");

        assert!(registry.verify(&digest, &sig, &key.public_key, Algorithm::EdDsa));
        assert!(!registry.verify(&digest, &sig, &ed25519::generate().public_key, Algorithm::EdDsa));
        assert!(!registry.verify(&digest, &sig, &key.public_key, Algorithm::Es256k));
    }

    #[test]
    fn unregistered_algorithm_fails_closed() {
        let key = ed25519::generate();
        let registry = SuiteRegistry::new();
        let digest = codec::sha256(b"message");

        let err = registry.sign(&digest, &key.private_key, Algorithm::EdDsa).expect_err("no suite");
        assert!(err.is(Err::UnsupportedAlgorithm));

        let sig = SuiteRegistry::with_defaults()
            .sign(&digest, &key.private_key, Algorithm::EdDsa)
            .expect("should sign");
        assert!(!registry.verify(&digest, &sig, &key.public_key, Algorithm::EdDsa));
    }

    #[test]
    fn verify_never_panics_on_garbage() {
        let registry = SuiteRegistry::with_defaults();
        let digest = codec::sha256(b"message");
        assert!(!registry.verify(&digest, "not base64!", &[1, 2, 3], Algorithm::Es256k));
        assert!(!registry.verify(&digest, "AAAA", &[1, 2, 3], Algorithm::EdDsa));
    }
}

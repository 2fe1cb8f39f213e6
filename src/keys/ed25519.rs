//! Ed25519 wallet keys and their X25519 key-agreement counterparts.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use crate::error::Err;
use crate::keys::{Curve, KeyPair};
use crate::{tracerr, Result};

/// Length of an Ed25519 seed.
pub const SEED_LEN: usize = 32;

/// Create an Ed25519 key pair from the first 32 bytes of a seed.
///
/// # Errors
///
/// * `Err::InvalidKey` - the seed is shorter than 32 bytes.
pub fn keys_from_seed(seed: &[u8]) -> Result<KeyPair> {
    let Some(bytes) = seed.get(..SEED_LEN) else {
        tracerr!(Err::InvalidKey, "seed must be at least {SEED_LEN} bytes, got {}", seed.len());
    };
    let mut secret = [0u8; SEED_LEN];
    secret.copy_from_slice(bytes);
    Ok(from_signing_key(&SigningKey::from_bytes(&secret)))
}

/// Generate a random Ed25519 key pair.
#[must_use]
pub fn generate() -> KeyPair {
    from_signing_key(&SigningKey::generate(&mut OsRng))
}

fn from_signing_key(signing_key: &SigningKey) -> KeyPair {
    KeyPair {
        curve: Curve::Ed25519,
        public_key: signing_key.verifying_key().to_bytes().to_vec(),
        private_key: signing_key.to_bytes().to_vec(),
    }
}

/// Convert an Ed25519 key pair into the X25519 key pair for the same secret. The public key is the
/// Montgomery form of the Edwards point; the private key is the (unclamped) X25519 scalar.
///
/// # Errors
///
/// * `Err::InvalidKey` - the key pair is not an Ed25519 key pair.
pub fn to_x25519(keypair: &KeyPair) -> Result<KeyPair> {
    if keypair.curve != Curve::Ed25519 {
        tracerr!(Err::InvalidKey, "expected an Ed25519 key pair, got {:?}", keypair.curve);
    }
    let Ok(secret) = <[u8; SEED_LEN]>::try_from(keypair.private_key.as_slice()) else {
        tracerr!(Err::InvalidKey, "Ed25519 private key must be {SEED_LEN} bytes");
    };
    let signing_key = SigningKey::from_bytes(&secret);

    Ok(KeyPair {
        curve: Curve::X25519,
        public_key: signing_key.verifying_key().to_montgomery().to_bytes().to_vec(),
        private_key: signing_key.to_scalar_bytes().to_vec(),
    })
}

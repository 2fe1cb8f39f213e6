//! Mnemonic key system. Derives secp256k1 key pairs for symbolic purposes from a BIP-39 mnemonic
//! using BIP-32 hierarchical-deterministic derivation along `m/44'/60'/0'/{purpose}/{version}`.

use std::fmt::Display;
use std::str::FromStr;

use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};

use crate::error::{Err, Error};
use crate::keys::{Curve, KeyPair};
use crate::{tracerr, Result};

/// Length of a seed derived from a mnemonic.
pub const SEED_LEN: usize = 64;

/// Number of words in a generated mnemonic.
pub const MNEMONIC_WORDS: usize = 12;

/// Symbolic purpose a derived key is used for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Purpose {
    /// Root key.
    Root,
    /// Recovery key. Shares the root derivation index.
    Recovery,
    /// Primary signing key.
    Primary,
    /// Attestation key.
    Attestation,
}

impl Purpose {
    /// Derivation path index for the purpose.
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Root | Self::Recovery => 0,
            Self::Primary => 1,
            Self::Attestation => 2,
        }
    }

    /// Parse a purpose, falling back to [`Purpose::Root`] when it is not recognized. Only use this
    /// when a caller explicitly wants the root path for unknown purposes.
    #[must_use]
    pub fn parse_or_root(purpose: &str) -> Self {
        purpose.parse().unwrap_or(Self::Root)
    }
}

impl FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "root" => Ok(Self::Root),
            "recovery" => Ok(Self::Recovery),
            "primary" => Ok(Self::Primary),
            "attestation" => Ok(Self::Attestation),
            _ => tracerr!(Err::UnknownPurpose, "unknown key purpose: {s}"),
        }
    }
}

impl Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Recovery => write!(f, "recovery"),
            Self::Primary => write!(f, "primary"),
            Self::Attestation => write!(f, "attestation"),
        }
    }
}

/// Derivation path for a purpose and key version.
#[must_use]
pub fn path_for(purpose: Purpose, version: u32) -> String {
    format!("m/44'/60'/0'/{}/{version}", purpose.index())
}

/// Generate a new 12-word English mnemonic.
///
/// # Errors
///
/// * `Err::InvalidKey` - the system random source failed.
pub fn generate_mnemonic() -> Result<String> {
    let mnemonic = Mnemonic::generate_in(Language::English, MNEMONIC_WORDS)?;
    Ok(mnemonic.to_string())
}

/// Derive the 512-bit seed for a mnemonic (empty passphrase). Accepts any BIP-39 length from 12
/// to 24 words.
///
/// # Errors
///
/// * `Err::InvalidKey` - the mnemonic has unknown words, a bad length or a bad checksum.
pub fn derive_seed(mnemonic: &str) -> Result<[u8; SEED_LEN]> {
    let mnemonic = Mnemonic::parse_in(Language::English, mnemonic.trim())?;
    Ok(mnemonic.to_seed(""))
}

/// Key system rooted in a single mnemonic. Holds the BIP-32 root node; every derivation is a pure
/// function of the mnemonic, purpose and version.
#[derive(Clone)]
pub struct MnemonicKeySystem {
    root: XPrv,
}

impl std::fmt::Debug for MnemonicKeySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MnemonicKeySystem").finish_non_exhaustive()
    }
}

impl MnemonicKeySystem {
    /// Create a key system from a mnemonic.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidKey` - the mnemonic is not valid.
    pub fn new(mnemonic: &str) -> Result<Self> {
        let seed = derive_seed(mnemonic)?;
        Self::from_seed(&seed)
    }

    /// Create a key system from a seed.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidKey` - the seed does not produce a valid master key.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let root = XPrv::new(seed)?;
        Ok(Self { root })
    }

    /// Derive the key pair at a derivation path such as `m/44'/60'/0'/1/0`. The public key is
    /// compressed SEC1, the private key is the raw 32-byte scalar.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidKey` - the path is malformed or derivation fails.
    pub fn key_from_path(&self, path: &str) -> Result<KeyPair> {
        let path: DerivationPath = path.parse()?;
        let mut node = self.root.clone();
        for child in path.iter() {
            node = node.derive_child(child)?;
        }

        Ok(KeyPair {
            curve: Curve::Secp256k1,
            public_key: node.public_key().to_bytes().to_vec(),
            private_key: node.to_bytes().to_vec(),
        })
    }

    /// Derive the key pair for a purpose and version.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidKey` - derivation fails.
    pub fn key_for_purpose(&self, purpose: Purpose, version: u32) -> Result<KeyPair> {
        let path = path_for(purpose, version);
        tracing::debug!("deriving {purpose} key at {path}");
        self.key_from_path(&path)
    }

    /// Derive the key pair for a purpose given by name. Unknown purposes fail closed.
    ///
    /// # Errors
    ///
    /// * `Err::UnknownPurpose` - the purpose is not recognized.
    /// * `Err::InvalidKey` - derivation fails.
    pub fn key_for(&self, purpose: &str, version: u32) -> Result<KeyPair> {
        self.key_for_purpose(purpose.parse()?, version)
    }
}

/// Expand a compressed secp256k1 public key (hex) to its 64-byte uncompressed form (hex, without
/// the `04` prefix).
///
/// # Errors
///
/// * `Err::InvalidFormat` - not hex.
/// * `Err::InvalidKey` - not a valid secp256k1 point.
pub fn uncompressed_public_key(compressed: &str) -> Result<String> {
    let bytes = hex::decode(compressed)?;
    let vk = k256::ecdsa::VerifyingKey::from_sec1_bytes(&bytes)?;
    Ok(hex::encode(&vk.to_encoded_point(false).as_bytes()[1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
                            abandon abandon abandon about";

    #[test]
    fn paths() {
        assert_eq!(path_for(Purpose::Root, 0), "m/44'/60'/0'/0/0");
        assert_eq!(path_for(Purpose::Recovery, 3), "m/44'/60'/0'/0/3");
        assert_eq!(path_for(Purpose::Primary, 0), "m/44'/60'/0'/1/0");
        assert_eq!(path_for(Purpose::Attestation, 1), "m/44'/60'/0'/2/1");
    }

    #[test]
    fn unknown_purpose_fails_closed() {
        let err = "signing".parse::<Purpose>().expect_err("should reject");
        assert!(err.is(Err::UnknownPurpose));
        assert_eq!(Purpose::parse_or_root("signing"), Purpose::Root);

        let mks = MnemonicKeySystem::new(MNEMONIC).expect("should create key system");
        assert!(mks.key_for("signing", 0).is_err());
    }

    #[test]
    fn seed_vector() {
        let seed = derive_seed(MNEMONIC).expect("should derive seed");
        assert_eq!(
            hex::encode(seed),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }

    #[test]
    fn root_key_vector() {
        let mks = MnemonicKeySystem::new(MNEMONIC).expect("should create key system");
        let key = mks.key_for_purpose(Purpose::Root, 0).expect("should derive key");
        assert_eq!(
            key.private_key_hex(),
            "1ab42cc412b618bdea3a599e3c9bae199ebf030895b039e9db1e30dafb12b727"
        );
        assert_eq!(
            key.public_key_hex(),
            "0237b0bb7a8288d38ed49a524b5dc98cff3eb5ca824c9f9dc0dfdb3d9cd600f299"
        );
        assert_eq!(key.curve, Curve::Secp256k1);
    }

    #[test]
    fn derivation_is_deterministic() {
        let mnemonic = generate_mnemonic().expect("should generate mnemonic");
        assert_eq!(mnemonic.split_whitespace().count(), MNEMONIC_WORDS);
        let first = MnemonicKeySystem::new(&mnemonic).expect("should create key system");
        let second = MnemonicKeySystem::new(&mnemonic).expect("should create key system");

        let a = first.key_for("primary", 0).expect("should derive key");
        let b = second.key_for("primary", 0).expect("should derive key");
        assert_eq!(a, b);

        let recovery = first.key_for("recovery", 0).expect("should derive key");
        let root = first.key_for("root", 0).expect("should derive key");
        assert_eq!(recovery, root);
        assert_ne!(a, root);
        assert_ne!(a, first.key_for("primary", 1).expect("should derive key"));
    }

    // 12, 18 and 24 word phrases are all accepted
    #[test]
    fn mnemonic_lengths() {
        let twenty_four = "abandon ".repeat(23) + "art";
        let seed = derive_seed(&twenty_four).expect("should accept 24 words");
        assert_ne!(seed, derive_seed(MNEMONIC).expect("should accept 12 words"));

        let eighteen = "abandon ".repeat(17) + "agent";
        derive_seed(&eighteen).expect("should accept 18 words");

        let eleven = "abandon ".repeat(10) + "about";
        let err = derive_seed(&eleven).expect_err("should reject 11 words");
        assert!(err.is(Err::InvalidKey));
    }

    #[test]
    fn bad_checksum() {
        let bad = MNEMONIC.replace("about", "abandon");
        assert!(derive_seed(&bad).is_err());
    }

    #[test]
    fn uncompressed_key() {
        let mks = MnemonicKeySystem::new(MNEMONIC).expect("should create key system");
        let key = mks.key_for_purpose(Purpose::Primary, 0).expect("should derive key");
        let uncompressed = uncompressed_public_key(&key.public_key_hex()).expect("should expand");
        assert_eq!(uncompressed.len(), 128);
        assert_eq!(&uncompressed[..64], &key.public_key_hex()[2..]);
    }
}

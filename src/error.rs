//! # Errors
//!
//! Error types used across key derivation, payload encoding, operation construction and chain
//! validation. Errors carry a typed [`Err`] code as their root cause, decorated with context.

use std::fmt::Display;

use thiserror::Error;

/// Log an error code at `error` level and return early with it, optionally decorated with a
/// formatted message.
///
/// # Example
/// ```
/// use hypns_did::error::Err;
/// use hypns_did::{tracerr, Result};
///
/// fn check_link(stated: &str, previous: &str) -> Result<()> {
///     if stated != previous {
///         tracerr!(Err::ChainIntegrity, "{stated} does not follow {previous}");
///     }
///     Ok(())
/// }
///
/// fn require_kid(kid: Option<&str>) -> Result<()> {
///     if kid.is_none() {
///         tracerr!(Err::KeyNotFound);
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! tracerr {
    // with context
    ($code:expr, $($msg:tt)*) => {
        {
        use $crate::error::Context as _;
        tracing::error!($($msg)*);
        return Err($code).context(format!($($msg)*));
        }
    };
    // no context
    ($code:expr) => {
        {
        tracing::error!("{}", $code);
        return Err($code.into());
        }
    }
}

/// Error returned by every fallible operation in the crate. The root cause is an [`Err`] code
/// (or a library error tagged with one) and the message is the most recent context.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(#[from] anyhow::Error);

impl Error {
    /// Render the error as `{"error": <code>, "error_description": <context>}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.0.root_cause().to_string(),
            "error_description": self.to_string(),
        })
    }

    /// Whether `err` is the code this error was raised with, including codes attached to library
    /// errors on conversion.
    #[must_use]
    pub fn is(&self, err: Err) -> bool {
        self.0.downcast_ref::<Err>().is_some_and(|e| e == &err)
    }
}

/// Typed error codes.
#[derive(Clone, Copy, Error, Debug, PartialEq, Eq)]
pub enum Err {
    /// Hash is not a valid SHA2-256 multihash.
    #[error("invalid_hash")]
    InvalidHash,

    /// Base64url, base58, hex or UTF-8 input could not be decoded.
    #[error("invalid_format")]
    InvalidFormat,

    /// Well-formed input that cannot be used, such as a duplicate wallet key or a document with
    /// no `id` to qualify against.
    #[error("invalid_input")]
    InvalidInput,

    /// The key material is malformed or does not belong to the expected curve.
    #[error("invalid_key")]
    InvalidKey,

    /// A patch could not be built or applied to a DID document.
    #[error("invalid_patch")]
    InvalidPatch,

    /// No key could be found for a fragment, purpose or key id.
    #[error("key_not_found")]
    KeyNotFound,

    /// An error occurred trying to deserialize data.
    #[error("deserialization_error")]
    DeserializationError,

    /// An error occurred trying to serialize data.
    #[error("serialization_error")]
    SerializationError,

    /// Construction parameters are missing or invalid.
    #[error("invalid_config")]
    InvalidConfig,

    /// Failure to sign a message.
    #[error("signing_error")]
    SigningError,

    /// A requested signing algorithm has no registered suite.
    #[error("unsupported_algorithm")]
    UnsupportedAlgorithm,

    /// A key derivation purpose is not one of the known purposes.
    #[error("unknown_purpose")]
    UnknownPurpose,

    /// An operation header names an operation type that is not understood.
    #[error("unknown_operation")]
    UnknownOperation,

    /// A recomputed operation hash does not match the stated `previousOperationHash`, or the
    /// operation sequence is otherwise not a valid chain.
    #[error("chain_integrity")]
    ChainIntegrity,

    /// An operation signature does not verify under the key its header names.
    #[error("invalid_signature")]
    InvalidSignature,

    /// The external name system failed.
    #[error("name_system")]
    NameSystem,
}

/// Attach a message to a failed result, keeping its [`Err`] code as the root cause.
pub trait Context<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Wrap the error with `context`.
    ///
    /// # Errors
    ///
    /// * The original error with `context` as its message.
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static;
}

impl<T, E> Context<T, E> for core::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(e) => Err(Error(anyhow::Error::from(e).context(context))),
        }
    }
}

impl From<Err> for Error {
    fn from(error: Err) -> Self {
        Self(error.into())
    }
}

impl From<base64ct::Error> for Error {
    fn from(err: base64ct::Error) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidFormat))
    }
}

impl From<bs58::decode::Error> for Error {
    fn from(err: bs58::decode::Error) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidFormat))
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidFormat))
    }
}

impl From<multihash::Error> for Error {
    fn from(err: multihash::Error) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidHash))
    }
}

impl From<k256::ecdsa::Error> for Error {
    fn from(err: k256::ecdsa::Error) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidKey))
    }
}

impl From<bip32::Error> for Error {
    fn from(err: bip32::Error) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidKey))
    }
}

impl From<bip39::Error> for Error {
    fn from(err: bip39::Error) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidKey))
    }
}

impl From<json_patch::PatchError> for Error {
    fn from(err: json_patch::PatchError) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidPatch))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self(anyhow::Error::from(err).context(Err::DeserializationError))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self(anyhow::Error::from(err).context(Err::InvalidFormat))
    }
}

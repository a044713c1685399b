//! Error types shared by the primitive layer.

use std::fmt;
use thiserror::Error;

/// Coarse failure class attached to every error in the workspace.
///
/// The class decides what callers do with a failure: malformed input is
/// dropped for good, semantic rejections may be resubmitted once the ledger
/// changes, replay violations are permanent for that nonce, store failures
/// abort the current block attempt and invariant violations halt acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Structural failure, permanent.
    MalformedInput,
    /// Ledger state does not allow the operation (yet).
    SemanticRejection,
    /// Nonce or nonce-table entry already consumed.
    ReplayViolation,
    /// Underlying key/value store failed.
    StoreFailure,
    /// Corruption or a consensus-layer bug.
    StateInvariantViolation,
}

impl ErrorClass {
    /// Returns true when the same input can never succeed.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::MalformedInput | Self::ReplayViolation)
    }

    /// Returns true when the failure must stop block acceptance.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::StoreFailure | Self::StateInvariantViolation)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MalformedInput => "malformed input",
            Self::SemanticRejection => "semantic rejection",
            Self::ReplayViolation => "replay violation",
            Self::StoreFailure => "store failure",
            Self::StateInvariantViolation => "state invariant violation",
        };
        f.write_str(name)
    }
}

/// Errors raised by primitive types and the canonical codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Fixed-length value built from a slice of the wrong size.
    #[error("{kind}: invalid length, expected {expected}, got {actual}")]
    InvalidLength {
        /// Name of the target type.
        kind: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// Value could not be parsed.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Error message.
        message: String,
    },

    /// Token or stake symbol failed validation.
    #[error("invalid symbol {symbol:?}")]
    InvalidSymbol {
        /// Offending text.
        symbol: String,
    },

    /// Signer key or key set failed validation.
    #[error("invalid keys: {message}")]
    InvalidKeys {
        /// Error message.
        message: String,
    },

    /// Signature could not be decoded or did not verify.
    #[error("invalid signature: {message}")]
    InvalidSignature {
        /// Error message.
        message: String,
    },

    /// Canonical CBOR encoding failed.
    #[error("encode error: {message}")]
    Encode {
        /// Error message.
        message: String,
    },

    /// Canonical CBOR decoding failed or the input was not canonical.
    #[error("decode error: {message}")]
    Decode {
        /// Error message.
        message: String,
    },
}

impl PrimitiveError {
    /// Create an invalid format error.
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create an invalid keys error.
    pub fn invalid_keys<S: Into<String>>(message: S) -> Self {
        Self::InvalidKeys {
            message: message.into(),
        }
    }

    /// Create an invalid signature error.
    pub fn invalid_signature<S: Into<String>>(message: S) -> Self {
        Self::InvalidSignature {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Every primitive failure is a malformed input.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        ErrorClass::MalformedInput
    }
}

/// Result type for primitive operations.
pub type PrimitiveResult<T> = std::result::Result<T, PrimitiveError>;

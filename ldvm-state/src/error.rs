//! Error types for ledger operations.

use ldvm_primitives::{Address, BigUint, ErrorClass, PrimitiveError, TokenSymbol};
use thiserror::Error;

/// Errors raised by account, model and data operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero where a positive value is required, or malformed.
    #[error("invalid amount: {message}")]
    InvalidAmount {
        /// Reason.
        message: String,
    },

    /// Balance does not cover the requested amount.
    #[error("insufficient {token} balance, expected {expected}, got {got}")]
    InsufficientBalance {
        /// Token being debited.
        token: TokenSymbol,
        /// Amount required, pledge included.
        expected: BigUint,
        /// Current balance.
        got: BigUint,
    },

    /// Transaction nonce differs from the account nonce.
    #[error("invalid nonce, expected {expected}, got {got}")]
    NonceMismatch {
        /// Account nonce.
        expected: u64,
        /// Nonce carried by the transaction.
        got: u64,
    },

    /// Nonce already registered in the nonce table.
    #[error("nonce {nonce} exists at {expire}")]
    NonceExists {
        /// Expiry group.
        expire: u64,
        /// Offending nonce.
        nonce: u64,
    },

    /// Nonce not registered, or already consumed.
    #[error("nonce {nonce} not exists at {expire}")]
    NonceNotExists {
        /// Expiry group.
        expire: u64,
        /// Offending nonce.
        nonce: u64,
    },

    /// Invalid nonce-table request.
    #[error("invalid nonce table: {message}")]
    NonceTable {
        /// Reason.
        message: String,
    },

    /// Keeper set or threshold rejected.
    #[error("invalid keepers: {message}")]
    InvalidKeepers {
        /// Reason.
        message: String,
    },

    /// Operation not allowed for this kind of account.
    #[error("{address}: {message}")]
    InvalidKind {
        /// Account address.
        address: Address,
        /// Reason.
        message: String,
    },

    /// Ledger state does not allow the operation.
    #[error("{message}")]
    Rejected {
        /// Reason.
        message: String,
    },

    /// Record payload or configuration is malformed.
    #[error("invalid {kind}: {message}")]
    Malformed {
        /// What was being validated.
        kind: &'static str,
        /// Reason.
        message: String,
    },

    /// Persisted state violates an invariant.
    #[error("corrupted {kind}: {message}")]
    Corrupted {
        /// Record category.
        kind: &'static str,
        /// Reason.
        message: String,
    },
}

impl LedgerError {
    /// Create an invalid amount error.
    pub fn invalid_amount<S: Into<String>>(message: S) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    /// Create a nonce table error.
    pub fn nonce_table<S: Into<String>>(message: S) -> Self {
        Self::NonceTable {
            message: message.into(),
        }
    }

    /// Create an invalid keepers error.
    pub fn invalid_keepers<S: Into<String>>(message: S) -> Self {
        Self::InvalidKeepers {
            message: message.into(),
        }
    }

    /// Create an invalid kind error.
    pub fn invalid_kind<S: Into<String>>(address: Address, message: S) -> Self {
        Self::InvalidKind {
            address,
            message: message.into(),
        }
    }

    /// Create a generic rejection.
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create a malformed input error.
    pub fn malformed<S: Into<String>>(kind: &'static str, message: S) -> Self {
        Self::Malformed {
            kind,
            message: message.into(),
        }
    }

    /// Create a corrupted state error.
    pub fn corrupted<S: Into<String>>(kind: &'static str, message: S) -> Self {
        Self::Corrupted {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NonceMismatch { expected, got } if got < expected => ErrorClass::ReplayViolation,
            Self::NonceExists { .. } | Self::NonceNotExists { .. } => ErrorClass::ReplayViolation,
            Self::Malformed { .. } => ErrorClass::MalformedInput,
            Self::Corrupted { .. } => ErrorClass::StateInvariantViolation,
            _ => ErrorClass::SemanticRejection,
        }
    }
}

impl From<PrimitiveError> for LedgerError {
    fn from(err: PrimitiveError) -> Self {
        match err {
            PrimitiveError::InvalidKeys { message } => Self::InvalidKeepers { message },
            other => Self::Malformed {
                kind: "value",
                message: other.to_string(),
            },
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_message() {
        let err = LedgerError::InsufficientBalance {
            token: TokenSymbol::NATIVE,
            expected: BigUint::from(150u64),
            got: BigUint::from(100u64),
        };
        assert_eq!(
            err.to_string(),
            "insufficient NativeLDC balance, expected 150, got 100"
        );
        assert_eq!(err.class(), ErrorClass::SemanticRejection);
    }

    #[test]
    fn test_nonce_classes() {
        let replay = LedgerError::NonceMismatch {
            expected: 5,
            got: 4,
        };
        assert_eq!(replay.class(), ErrorClass::ReplayViolation);
        let future = LedgerError::NonceMismatch {
            expected: 5,
            got: 6,
        };
        assert_eq!(future.class(), ErrorClass::SemanticRejection);
        assert_eq!(
            LedgerError::NonceNotExists { expire: 1, nonce: 2 }.class(),
            ErrorClass::ReplayViolation
        );
    }
}

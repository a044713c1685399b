//! Error types for the transaction pipeline.

use ldvm_primitives::{ErrorClass, PrimitiveError, TxType};
use ldvm_state::LedgerError;
use ldvm_store::StoreError;
use thiserror::Error;

/// Errors raised while decoding, verifying or accepting a transaction.
#[derive(Error, Debug)]
pub enum TxError {
    /// Type tag not assigned to any transaction kind.
    #[error("unknown transaction type {0}")]
    UnknownTxType(u16),

    /// Field shape or payload encoding rejected.
    #[error("{tx_type}: {message}")]
    Malformed { tx_type: TxType, message: String },

    /// Well-formed but not valid against the current state.
    #[error("{tx_type}: {message}")]
    Rejected { tx_type: TxType, message: String },

    /// A ledger operation refused the transaction.
    #[error("{tx_type}: {source}")]
    Ledger {
        tx_type: TxType,
        #[source]
        source: LedgerError,
    },

    /// Batch container rejected.
    #[error("invalid batch: {message}")]
    Batch { message: String },

    /// Signature recovery or encoding failure.
    #[error("{0}")]
    Primitive(#[from] PrimitiveError),

    /// State loaded by the block context failed validation.
    #[error("state: {0}")]
    State(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TxError {
    pub fn malformed<S: Into<String>>(tx_type: TxType, message: S) -> Self {
        Self::Malformed {
            tx_type,
            message: message.into(),
        }
    }

    pub fn rejected<S: Into<String>>(tx_type: TxType, message: S) -> Self {
        Self::Rejected {
            tx_type,
            message: message.into(),
        }
    }

    pub fn batch<S: Into<String>>(message: S) -> Self {
        Self::Batch {
            message: message.into(),
        }
    }

    /// Classification used by the pool and block builder to decide between
    /// retrying later and dropping for good.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            TxError::UnknownTxType(_) | TxError::Malformed { .. } | TxError::Batch { .. } => {
                ErrorClass::MalformedInput
            }
            TxError::Rejected { .. } => ErrorClass::SemanticRejection,
            TxError::Ledger { source, .. } | TxError::State(source) => source.class(),
            TxError::Primitive(err) => err.class(),
            TxError::Store(err) => err.class(),
        }
    }

    /// True when no later state can make the transaction valid.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.class().is_permanent()
    }
}

/// Wraps ledger errors raised while handling a `tx_type` transaction.
pub fn ledger_error(tx_type: TxType) -> impl Fn(LedgerError) -> TxError {
    move |source| TxError::Ledger { tx_type, source }
}

/// Result type for transaction operations.
pub type TxResult<T> = std::result::Result<T, TxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(TxError::UnknownTxType(99).class(), ErrorClass::MalformedInput);
        assert_eq!(
            TxError::rejected(TxType::Transfer, "no").class(),
            ErrorClass::SemanticRejection
        );
        let nonce = ledger_error(TxType::Transfer)(LedgerError::NonceMismatch {
            expected: 1,
            got: 0,
        });
        assert_eq!(nonce.class(), ErrorClass::ReplayViolation);
        assert_eq!(nonce.to_string(), "TypeTransfer: invalid nonce, expected 1, got 0");
        assert!(TxError::Store(StoreError::backend("io")).class().is_fatal());
    }
}

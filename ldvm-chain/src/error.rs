//! Chain error types

use ldvm_config::ConfigError;
use ldvm_primitives::{ErrorClass, Hash256, PrimitiveError};
use ldvm_state::LedgerError;
use ldvm_store::StoreError;
use ldvm_txs::TxError;
use thiserror::Error;

use crate::block::BlockStatus;

/// Chain-related errors
#[derive(Debug, Error)]
pub enum ChainError {
    /// Block not found
    #[error("block not found: {0}")]
    BlockNotFound(Hash256),

    /// Parent exists but has no executed state yet
    #[error("parent {0} has not been verified")]
    ParentNotVerified(Hash256),

    /// Structurally invalid block
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    /// Invalid block height
    #[error("invalid block height: expected {expected}, got {actual}")]
    InvalidHeight { expected: u64, actual: u64 },

    /// Invalid timestamp
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Header field disagrees with the value derived from the parent
    #[error("invalid {field}: expected {expected}, got {actual}")]
    InvalidHeader {
        field: &'static str,
        expected: u64,
        actual: u64,
    },

    /// Another block is already stored at this height
    #[error("block already exists at height {0}")]
    HeightTaken(u64),

    /// Executing the body produced a different state
    #[error("state root mismatch: expected {expected}, got {actual}")]
    StateRootMismatch { expected: Hash256, actual: Hash256 },

    /// Operation not allowed in the block's current status
    #[error("block {id} is {status}, cannot {operation}")]
    InvalidStatus {
        id: Hash256,
        status: BlockStatus,
        operation: &'static str,
    },

    /// Accepting a block whose parent is not the last accepted block
    #[error("block {id} does not extend the last accepted block {last_accepted}")]
    NotNextBlock { id: Hash256, last_accepted: Hash256 },

    /// Nothing in the pool could be included
    #[error("no transactions to build a block")]
    NoTransactions,

    /// Chain handle was dropped while a block still referenced it
    #[error("chain is closed")]
    Closed,

    /// Transaction failed inside a block
    #[error(transparent)]
    Tx(#[from] TxError),

    /// Stored ledger object failed validation
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Encoding error
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),

    /// Chain configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ChainError {
    /// Classification of the failure. Invariant violations must halt block
    /// acceptance.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            ChainError::BlockNotFound(_)
            | ChainError::ParentNotVerified(_)
            | ChainError::NoTransactions => ErrorClass::SemanticRejection,
            ChainError::InvalidBlock(_)
            | ChainError::InvalidHeight { .. }
            | ChainError::InvalidTimestamp(_)
            | ChainError::InvalidHeader { .. } => ErrorClass::MalformedInput,
            ChainError::HeightTaken(_)
            | ChainError::StateRootMismatch { .. }
            | ChainError::InvalidStatus { .. }
            | ChainError::NotNextBlock { .. }
            | ChainError::Closed => ErrorClass::StateInvariantViolation,
            ChainError::Tx(err) => err.class(),
            ChainError::Ledger(err) => err.class(),
            ChainError::Store(err) => err.class(),
            ChainError::Primitive(err) => err.class(),
            ChainError::Config(err) => err.class(),
        }
    }
}

/// Result type for chain operations
pub type ChainResult<T> = Result<T, ChainError>;

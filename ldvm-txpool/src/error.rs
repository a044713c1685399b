//! Error types for the transaction pool.

use ldvm_primitives::{ErrorClass, Hash256};
use thiserror::Error;

/// Errors returned by pool admission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The queue holds `capacity` entries already.
    #[error("transaction pool is full, capacity {capacity}")]
    Full { capacity: usize },

    /// The id was rejected before and is still remembered.
    #[error("transaction {0} was rejected")]
    Rejected(Hash256),
}

impl PoolError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            PoolError::Full { .. } => ErrorClass::SemanticRejection,
            PoolError::Rejected(_) => ErrorClass::MalformedInput,
        }
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = std::result::Result<T, PoolError>;

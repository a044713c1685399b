use ldvm_primitives::{ErrorClass, PrimitiveError};
use thiserror::Error;

/// Errors raised by storage backends and versioned overlays.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store: backend failure: {0}")]
    Backend(String),

    #[error("store: failed to decode {prefix} record: {message}")]
    Decode { prefix: &'static str, message: String },

    #[error("store: failed to encode record: {0}")]
    Encode(String),

    #[error("store: version {version} cannot commit before its parent")]
    ParentNotCommitted { version: u64 },

    #[error("store: version {version} was discarded")]
    Discarded { version: u64 },

    #[error("store: version {child} is not a child of version {parent}")]
    NotAChild { parent: u64, child: u64 },
}

impl StoreError {
    #[inline]
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }

    /// Backend failures abort the current attempt; misuse of versions means
    /// the caller broke the commit ordering.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::Backend(_) | StoreError::Decode { .. } | StoreError::Encode(_) => {
                ErrorClass::StoreFailure
            }
            StoreError::ParentNotCommitted { .. }
            | StoreError::Discarded { .. }
            | StoreError::NotAChild { .. } => ErrorClass::StateInvariantViolation,
        }
    }
}

impl From<PrimitiveError> for StoreError {
    fn from(err: PrimitiveError) -> Self {
        StoreError::Encode(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

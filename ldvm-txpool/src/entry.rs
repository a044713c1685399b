//! Entries held by the pool.

use ldvm_primitives::{Address, Hash256};
use ldvm_txs::TxOrBatch;

/// What the pool needs to know about a queued unit.
pub trait PoolItem: Clone + Send + Sync + 'static {
    fn id(&self) -> Hash256;

    /// Account whose nonce orders the item.
    fn sender(&self) -> Address;

    fn nonce(&self) -> u64;

    /// Encoded size in bytes.
    fn size(&self) -> u64;

    fn priority(&self) -> u64;
}

impl PoolItem for TxOrBatch {
    fn id(&self) -> Hash256 {
        TxOrBatch::id(self)
    }

    fn sender(&self) -> Address {
        TxOrBatch::sender(self)
    }

    fn nonce(&self) -> u64 {
        TxOrBatch::nonce(self)
    }

    fn size(&self) -> u64 {
        TxOrBatch::size(self)
    }

    /// Highest member priority for a batch.
    fn priority(&self) -> u64 {
        TxOrBatch::priority(self)
    }
}

/// A queued item with its id cached.
#[derive(Debug, Clone)]
pub(crate) struct PoolEntry<T> {
    pub(crate) item: T,
    pub(crate) id: Hash256,
}

impl<T: PoolItem> PoolEntry<T> {
    pub(crate) fn new(item: T) -> Self {
        Self {
            id: item.id(),
            item,
        }
    }
}

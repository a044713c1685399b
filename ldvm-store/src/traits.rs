use serde::de::DeserializeOwned;
use serde::Serialize;

use ldvm_primitives::{from_canonical_slice, to_canonical_vec};

use crate::error::{StoreError, StoreResult};
use crate::prefix::{Prefix, Record};

/// Operation to be applied via a write batch.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BatchOp {
    Put {
        prefix: Prefix,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        prefix: Prefix,
        key: Vec<u8>,
    },
}

/// Ordered set of operations that should be applied atomically.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    #[inline]
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    #[inline]
    pub fn put(&mut self, prefix: Prefix, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { prefix, key, value });
    }

    #[inline]
    pub fn delete(&mut self, prefix: Prefix, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { prefix, key });
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn operations(&self) -> &[BatchOp] {
        &self.ops
    }

    #[inline]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Abstraction exposed by storage backends.
pub trait Store: Send + Sync {
    fn get(&self, prefix: Prefix, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn put(&self, prefix: Prefix, key: Vec<u8>, value: Vec<u8>) -> StoreResult<()>;

    fn delete(&self, prefix: Prefix, key: &[u8]) -> StoreResult<()>;

    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()>;

    fn has(&self, prefix: Prefix, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(prefix, key)?.is_some())
    }
}

/// Typed helpers storing records as canonical CBOR under their prefix.
pub trait StoreExt: Store {
    fn put_record<V: Record + Serialize>(&self, key: Vec<u8>, value: &V) -> StoreResult<()> {
        self.put(V::PREFIX, key, to_canonical_vec(value)?)
    }

    fn get_record<V: Record + Serialize + DeserializeOwned>(
        &self,
        key: &[u8],
    ) -> StoreResult<Option<V>> {
        match self.get(V::PREFIX, key)? {
            Some(bytes) => decode_record::<V>(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

impl<T: Store + ?Sized> StoreExt for T {}

/// Decodes a canonical record, naming its prefix on failure.
pub fn decode_record<V: Record + Serialize + DeserializeOwned>(bytes: &[u8]) -> StoreResult<V> {
    from_canonical_slice(bytes).map_err(|err| StoreError::Decode {
        prefix: V::PREFIX.name(),
        message: err.to_string(),
    })
}

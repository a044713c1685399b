use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::StoreResult;
use crate::prefix::Prefix;
use crate::traits::{BatchOp, Store, WriteBatch};

/// In-memory store used by tests and local simulations.
///
/// Shares the key layout of the sled backend: one ordered keyspace whose
/// keys start with their prefix byte. A batch is applied under a single
/// write lock, so readers never observe half of it.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys stored under `prefix`.
    pub fn len(&self, prefix: Prefix) -> usize {
        let start = vec![prefix.byte()];
        self.entries
            .read()
            .range(start..)
            .take_while(|(key, _)| key.first() == Some(&prefix.byte()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn apply(entries: &mut BTreeMap<Vec<u8>, Vec<u8>>, op: BatchOp) {
    match op {
        BatchOp::Put { prefix, key, value } => {
            entries.insert(prefix.key(&key), value);
        }
        BatchOp::Delete { prefix, key } => {
            entries.remove(&prefix.key(&key));
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, prefix: Prefix, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(&prefix.key(key)).cloned())
    }

    fn put(&self, prefix: Prefix, key: Vec<u8>, value: Vec<u8>) -> StoreResult<()> {
        apply(&mut self.entries.write(), BatchOp::Put { prefix, key, value });
        Ok(())
    }

    fn delete(&self, prefix: Prefix, key: &[u8]) -> StoreResult<()> {
        self.entries.write().remove(&prefix.key(key));
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut entries = self.entries.write();
        for op in batch.into_ops() {
            apply(&mut entries, op);
        }
        Ok(())
    }
}

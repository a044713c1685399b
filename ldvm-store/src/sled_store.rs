use std::path::Path;

use sled::{Batch, Db};

use crate::{
    error::{StoreError, StoreResult},
    prefix::Prefix,
    traits::{BatchOp, Store, WriteBatch},
};

/// Persistent store backed by the `sled` embedded database.
///
/// All records share the default tree; keys carry their prefix byte so a
/// write batch applies atomically across categories.
pub struct SledStore {
    db: Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path).map_err(|err| StoreError::backend(err.to_string()))?;
        Ok(Self { db })
    }
}

impl Store for SledStore {
    fn get(&self, prefix: Prefix, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.db
            .get(prefix.key(key))
            .map_err(|err| StoreError::backend(err.to_string()))
            .map(|opt| opt.map(|ivec| ivec.as_ref().to_vec()))
    }

    fn put(&self, prefix: Prefix, key: Vec<u8>, value: Vec<u8>) -> StoreResult<()> {
        self.db
            .insert(prefix.key(&key), value)
            .map_err(|err| StoreError::backend(err.to_string()))?;
        Ok(())
    }

    fn delete(&self, prefix: Prefix, key: &[u8]) -> StoreResult<()> {
        self.db
            .remove(prefix.key(key))
            .map_err(|err| StoreError::backend(err.to_string()))?;
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut sled_batch = Batch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { prefix, key, value } => {
                    sled_batch.insert(prefix.key(&key), value);
                }
                BatchOp::Delete { prefix, key } => {
                    sled_batch.remove(prefix.key(&key));
                }
            }
        }

        self.db
            .apply_batch(sled_batch)
            .map_err(|err| StoreError::backend(err.to_string()))?;
        self.db
            .flush()
            .map_err(|err| StoreError::backend(err.to_string()))?;
        Ok(())
    }
}

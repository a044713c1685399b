//! Versioned overlays over a [`Store`].
//!
//! A [`VersionDb`] buffers writes in memory on top of a base store. Children
//! read through every uncommitted ancestor, so a block can be executed on
//! top of a parent that is still being decided. A version commits exactly
//! once and only after its parent; committing flushes its buffered writes
//! to the base store in one batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::prefix::Prefix;
use crate::traits::{Store, WriteBatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VersionState {
    Pending,
    Committed,
    Discarded,
}

type PendingWrites = BTreeMap<(Prefix, Vec<u8>), Option<Vec<u8>>>;

struct VersionInner {
    version: u64,
    base: Arc<dyn Store>,
    parent: Option<VersionDb>,
    pending: RwLock<PendingWrites>,
    state: Mutex<VersionState>,
}

/// Copy-on-write overlay. Cloning shares the same version.
#[derive(Clone)]
pub struct VersionDb {
    inner: Arc<VersionInner>,
}

impl VersionDb {
    /// Root version over `base`; it counts as committed.
    pub fn new(base: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(VersionInner {
                version: 0,
                base,
                parent: None,
                pending: RwLock::new(BTreeMap::new()),
                state: Mutex::new(VersionState::Committed),
            }),
        }
    }

    /// New pending version reading through this one.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(VersionInner {
                version: self.inner.version + 1,
                base: self.inner.base.clone(),
                parent: Some(self.clone()),
                pending: RwLock::new(BTreeMap::new()),
                state: Mutex::new(VersionState::Pending),
            }),
        }
    }

    pub fn version(&self) -> u64 {
        self.inner.version
    }

    pub fn base(&self) -> &Arc<dyn Store> {
        &self.inner.base
    }

    pub fn is_committed(&self) -> bool {
        *self.inner.state.lock() == VersionState::Committed
    }

    pub fn is_discarded(&self) -> bool {
        *self.inner.state.lock() == VersionState::Discarded
    }

    /// Number of buffered writes.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.read().len()
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        match *self.inner.state.lock() {
            VersionState::Pending => Ok(()),
            VersionState::Committed | VersionState::Discarded => Err(StoreError::Discarded {
                version: self.inner.version,
            }),
        }
    }

    pub fn get(&self, prefix: Prefix, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let mut current = Some(self);
        while let Some(db) = current {
            if db.is_committed() {
                break;
            }
            if let Some(value) = db.inner.pending.read().get(&(prefix, key.to_vec())) {
                return Ok(value.clone());
            }
            current = db.inner.parent.as_ref();
        }
        self.inner.base.get(prefix, key)
    }

    pub fn has(&self, prefix: Prefix, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(prefix, key)?.is_some())
    }

    pub fn put(&self, prefix: Prefix, key: Vec<u8>, value: Vec<u8>) -> StoreResult<()> {
        self.ensure_writable()?;
        self.inner.pending.write().insert((prefix, key), Some(value));
        Ok(())
    }

    pub fn delete(&self, prefix: Prefix, key: &[u8]) -> StoreResult<()> {
        self.ensure_writable()?;
        self.inner.pending.write().insert((prefix, key.to_vec()), None);
        Ok(())
    }

    /// Moves the writes of a direct child into this version. The child is
    /// discarded afterwards.
    pub fn absorb(&self, child: &VersionDb) -> StoreResult<()> {
        self.ensure_writable()?;
        let is_child = child
            .inner
            .parent
            .as_ref()
            .is_some_and(|parent| Arc::ptr_eq(&parent.inner, &self.inner));
        if !is_child {
            return Err(StoreError::NotAChild {
                parent: self.inner.version,
                child: child.inner.version,
            });
        }
        child.ensure_writable()?;
        let writes = std::mem::take(&mut *child.inner.pending.write());
        self.inner.pending.write().extend(writes);
        *child.inner.state.lock() = VersionState::Discarded;
        Ok(())
    }

    /// Flushes buffered writes to the base store. Committing twice is a
    /// no-op; committing before the parent is an error.
    pub fn commit(&self) -> StoreResult<()> {
        let mut state = self.inner.state.lock();
        match *state {
            VersionState::Committed => return Ok(()),
            VersionState::Discarded => {
                return Err(StoreError::Discarded {
                    version: self.inner.version,
                })
            }
            VersionState::Pending => {}
        }
        if let Some(parent) = &self.inner.parent {
            if !parent.is_committed() {
                return Err(StoreError::ParentNotCommitted {
                    version: self.inner.version,
                });
            }
        }

        let mut pending = self.inner.pending.write();
        let mut batch = WriteBatch::new();
        for ((prefix, key), value) in pending.iter() {
            match value {
                Some(value) => batch.put(*prefix, key.clone(), value.clone()),
                None => batch.delete(*prefix, key.clone()),
            }
        }
        let writes = batch.len();
        self.inner.base.write_batch(batch)?;
        pending.clear();
        *state = VersionState::Committed;
        debug!(version = self.inner.version, writes, "version committed");
        Ok(())
    }

    /// Drops buffered writes. A committed version cannot be discarded.
    pub fn discard(&self) -> StoreResult<()> {
        let mut state = self.inner.state.lock();
        match *state {
            VersionState::Committed => Err(StoreError::Discarded {
                version: self.inner.version,
            }),
            VersionState::Discarded => Ok(()),
            VersionState::Pending => {
                self.inner.pending.write().clear();
                *state = VersionState::Discarded;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for VersionDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionDb")
            .field("version", &self.inner.version)
            .field("state", &*self.inner.state.lock())
            .field("pending", &self.pending_len())
            .finish()
    }
}

//! The pending transaction pool.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use ldvm_primitives::{Address, Hash256};
use ldvm_txs::TxOrBatch;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, trace, warn};

use crate::config::TxPoolConfig;
use crate::entry::{PoolEntry, PoolItem};
use crate::error::{PoolError, PoolResult};
use crate::known::{KnownCache, KnownStatus};

/// Pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub queued: usize,
    pub queued_bytes: u64,
    pub known: usize,
}

#[derive(Debug)]
struct PoolInner<T> {
    queue: Vec<PoolEntry<T>>,
    ids: HashSet<Hash256>,
    known: KnownCache,
}

impl<T: PoolItem> PoolInner<T> {
    fn push(&mut self, item: T) {
        let entry = PoolEntry::new(item);
        self.ids.insert(entry.id);
        self.known.set(entry.id, KnownStatus::Pending);
        self.queue.push(entry);
    }

    /// Drops `ids` from the queue without reallocating it.
    fn remove(&mut self, ids: &HashSet<Hash256>) {
        if ids.is_empty() {
            return;
        }
        self.queue.retain(|entry| !ids.contains(&entry.id));
        for id in ids {
            self.ids.remove(id);
        }
    }
}

/// Transactions and batches waiting for a block.
///
/// Every operation is a short critical section behind one mutex. Admission
/// wakes the block builder through [`notifier`](Self::notifier); remote
/// admissions are also fanned out to [`subscribe`](Self::subscribe)rs once
/// the lock is released.
pub struct TxPool<T: PoolItem = TxOrBatch> {
    config: TxPoolConfig,
    inner: Mutex<PoolInner<T>>,
    gossip: broadcast::Sender<T>,
    notify: Arc<Notify>,
}

impl<T: PoolItem> TxPool<T> {
    #[must_use]
    pub fn new(config: TxPoolConfig) -> Self {
        let (gossip, _) = broadcast::channel(config.gossip_capacity.max(1));
        let inner = PoolInner {
            queue: Vec::new(),
            ids: HashSet::new(),
            known: KnownCache::new(Duration::from_secs(config.known_ttl_secs)),
        };
        Self {
            config,
            inner: Mutex::new(inner),
            gossip,
            notify: Arc::new(Notify::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TxPoolConfig {
        &self.config
    }

    /// Receives every item admitted by [`add_remote`](Self::add_remote).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.gossip.subscribe()
    }

    /// Signalled whenever new items are admitted.
    #[must_use]
    pub fn notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    /// Admits items submitted by clients or peers. Items already queued or
    /// remembered in any status are skipped silently. Returns how many
    /// were admitted.
    pub fn add_remote(&self, items: Vec<T>) -> PoolResult<usize> {
        let mut admitted = Vec::new();
        let mut full = false;
        {
            let mut inner = self.inner.lock();
            inner.known.prune();
            for item in items {
                let id = item.id();
                if inner.ids.contains(&id) || inner.known.get(&id).is_some() {
                    trace!(%id, "known transaction skipped");
                    continue;
                }
                if inner.queue.len() >= self.config.max_entries {
                    full = true;
                    break;
                }
                inner.push(item.clone());
                admitted.push(item);
            }
        }

        if !admitted.is_empty() {
            debug!(count = admitted.len(), "remote transactions admitted");
            self.notify.notify_one();
            for item in &admitted {
                // no subscribers is not an error
                let _ = self.gossip.send(item.clone());
            }
        }
        if full {
            warn!(capacity = self.config.max_entries, "transaction pool full");
            return Err(PoolError::Full {
                capacity: self.config.max_entries,
            });
        }
        Ok(admitted.len())
    }

    /// Re-admits items handed back by a block build or a rejected block.
    /// Rejected ids and queued items are skipped; nothing is gossiped and
    /// the capacity limit does not apply.
    pub fn add_local(&self, items: Vec<T>) -> usize {
        let mut count = 0;
        {
            let mut inner = self.inner.lock();
            inner.known.prune();
            for item in items {
                let id = item.id();
                if inner.ids.contains(&id) || inner.known.get(&id) == Some(KnownStatus::Rejected) {
                    continue;
                }
                inner.push(item);
                count += 1;
            }
        }
        if count > 0 {
            debug!(count, "local transactions re-admitted");
            self.notify.notify_one();
        }
        count
    }

    /// Removes and returns the highest-priority items whose sizes sum to at
    /// most `budget` bytes.
    ///
    /// Items are grouped by sender and ordered by nonce. Each sender gets
    /// one score, the size-weighted mean priority of its items; an item's
    /// priority is that score discounted by the bytes its sender already
    /// queued ahead of it, so lower nonces come first and one sender's many
    /// items do not crowd out the others. Candidates are stably sorted by
    /// descending priority and taken greedily; once an item of a sender
    /// does not fit, later items of that sender are skipped.
    pub fn pop_txs_by_size(&self, budget: u64) -> Vec<T> {
        let mut inner = self.inner.lock();
        if inner.queue.is_empty() {
            return Vec::new();
        }

        let mut senders: Vec<Address> = Vec::new();
        let mut groups: HashMap<Address, Vec<usize>> = HashMap::new();
        for (index, entry) in inner.queue.iter().enumerate() {
            let sender = entry.item.sender();
            groups
                .entry(sender)
                .or_insert_with(|| {
                    senders.push(sender);
                    Vec::new()
                })
                .push(index);
        }

        let queue = &inner.queue;
        let mut candidates: Vec<(u64, usize)> = Vec::with_capacity(queue.len());
        for sender in &senders {
            let Some(indexes) = groups.get_mut(sender) else {
                continue;
            };
            indexes.sort_by_key(|index| queue[*index].item.nonce());
            let total: u128 = indexes
                .iter()
                .map(|index| u128::from(queue[*index].item.size().max(1)))
                .sum();
            let weighted: u128 = indexes
                .iter()
                .map(|index| {
                    let item = &queue[*index].item;
                    u128::from(item.priority()) * u128::from(item.size().max(1))
                })
                .sum();
            let score = weighted / total;
            let mut ahead = 0u128;
            for index in indexes.iter() {
                let priority = score * total / (total + ahead);
                candidates.push((u64::try_from(priority).unwrap_or(u64::MAX), *index));
                ahead += u128::from(queue[*index].item.size().max(1));
            }
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        let mut used = 0u64;
        let mut blocked: HashSet<Address> = HashSet::new();
        let mut picked: Vec<usize> = Vec::new();
        for (_, index) in candidates {
            let item = &queue[index].item;
            let sender = item.sender();
            if blocked.contains(&sender) {
                continue;
            }
            match used.checked_add(item.size()) {
                Some(next) if next <= budget => {
                    used = next;
                    picked.push(index);
                }
                _ => {
                    blocked.insert(sender);
                }
            }
        }

        let selected: Vec<T> = picked.iter().map(|index| queue[*index].item.clone()).collect();
        let ids: HashSet<Hash256> = picked.iter().map(|index| queue[*index].id).collect();
        inner.remove(&ids);
        debug!(count = selected.len(), bytes = used, budget, remaining = inner.queue.len(), "transactions popped");
        selected
    }

    /// Marks `id` permanently rejected and drops it from the queue.
    pub fn reject(&self, id: &Hash256) {
        let mut inner = self.inner.lock();
        inner.known.prune();
        inner.known.set(*id, KnownStatus::Rejected);
        inner.remove(&HashSet::from([*id]));
        debug!(%id, "transaction rejected");
    }

    /// Marks `ids` included at `height` and drops them from the queue.
    pub fn set_included(&self, height: u64, ids: &[Hash256]) {
        let mut inner = self.inner.lock();
        inner.known.prune();
        for id in ids {
            inner.known.set(*id, KnownStatus::Included(height));
        }
        inner.remove(&ids.iter().copied().collect());
    }

    /// A queued item.
    #[must_use]
    pub fn get(&self, id: &Hash256) -> Option<T> {
        let inner = self.inner.lock();
        if !inner.ids.contains(id) {
            return None;
        }
        inner
            .queue
            .iter()
            .find(|entry| entry.id == *id)
            .map(|entry| entry.item.clone())
    }

    /// Status of a queued or remembered id.
    #[must_use]
    pub fn known_status(&self, id: &Hash256) -> Option<KnownStatus> {
        let inner = self.inner.lock();
        if inner.ids.contains(id) {
            return Some(KnownStatus::Pending);
        }
        inner.known.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            queued: inner.queue.len(),
            queued_bytes: inner.queue.iter().map(|entry| entry.item.size()).sum(),
            known: inner.known.len(),
        }
    }
}

impl<T: PoolItem> Default for TxPool<T> {
    fn default() -> Self {
        Self::new(TxPoolConfig::default())
    }
}

impl<T: PoolItem> std::fmt::Debug for TxPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxPool")
            .field("config", &self.config)
            .field("queued", &self.len())
            .finish()
    }
}

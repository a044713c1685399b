//! TTL-bounded memory of ids that went through the pool.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ldvm_primitives::Hash256;
use serde::{Deserialize, Serialize};

/// Last known status of an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnownStatus {
    /// Admitted and not yet included or rejected.
    Pending,
    /// Permanently invalid.
    Rejected,
    /// Included in an accepted block at this height.
    Included(u64),
}

impl KnownStatus {
    /// Numeric form: `-1` pending, `-2` rejected, the height when included.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            KnownStatus::Pending => -1,
            KnownStatus::Rejected => -2,
            KnownStatus::Included(height) => i64::try_from(height).unwrap_or(i64::MAX),
        }
    }
}

#[derive(Debug)]
pub(crate) struct KnownCache {
    ttl: Duration,
    entries: HashMap<Hash256, (KnownStatus, Instant)>,
}

impl KnownCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, id: &Hash256) -> Option<KnownStatus> {
        self.entries
            .get(id)
            .filter(|(_, at)| at.elapsed() <= self.ttl)
            .map(|(status, _)| *status)
    }

    pub(crate) fn set(&mut self, id: Hash256, status: KnownStatus) {
        self.entries.insert(id, (status, Instant::now()));
    }

    /// Forgets expired ids, returning how many.
    pub(crate) fn prune(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, (_, at)| at.elapsed() <= ttl);
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

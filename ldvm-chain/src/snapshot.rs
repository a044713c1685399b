//! Per-block summary of changed ledger objects.

use std::collections::BTreeMap;

use ldvm_primitives::{canonical_hash, Address, DataId, Hash256, ModelId, PrimitiveResult};
use serde::{Deserialize, Serialize};

/// Content hashes of the objects a block changed, by category. A removed
/// object maps to [`Hash256::ZERO`]. The id of the snapshot is the state
/// root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// State root of the parent block
    pub parent: Hash256,
    pub accounts: BTreeMap<Address, Hash256>,
    pub ledgers: BTreeMap<Address, Hash256>,
    pub models: BTreeMap<ModelId, Hash256>,
    pub data: BTreeMap<DataId, Hash256>,
    pub names: BTreeMap<String, Hash256>,
}

impl StateSnapshot {
    #[must_use]
    pub fn new(parent: Hash256) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    /// The state root.
    pub fn id(&self) -> PrimitiveResult<Hash256> {
        canonical_hash(self)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.ledgers.is_empty()
            && self.models.is_empty()
            && self.data.is_empty()
            && self.names.is_empty()
    }

    /// Number of changed objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len() + self.ledgers.len() + self.models.len() + self.data.len() + self.names.len()
    }

    /// Takes over the entries of a child snapshot; later writes win.
    pub fn merge(&mut self, child: StateSnapshot) {
        self.accounts.extend(child.accounts);
        self.ledgers.extend(child.ledgers);
        self.models.extend(child.models);
        self.data.extend(child.data);
        self.names.extend(child.names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_depends_on_content_and_parent() {
        let mut a = StateSnapshot::new(Hash256::new([1; 32]));
        let empty_root = a.id().unwrap();
        a.accounts.insert(Address::new([2; 20]), Hash256::new([3; 32]));
        assert_ne!(a.id().unwrap(), empty_root);

        let mut b = StateSnapshot::new(Hash256::new([9; 32]));
        b.accounts = a.accounts.clone();
        assert_ne!(a.id().unwrap(), b.id().unwrap());
        b.parent = a.parent;
        assert_eq!(a.id().unwrap(), b.id().unwrap());
    }

    #[test]
    fn test_merge() {
        let address = Address::new([2; 20]);
        let mut parent = StateSnapshot::new(Hash256::ZERO);
        parent.accounts.insert(address, Hash256::new([1; 32]));
        let mut child = StateSnapshot::new(Hash256::ZERO);
        child.accounts.insert(address, Hash256::new([2; 32]));
        child.names.insert("ldc".into(), Hash256::ZERO);
        parent.merge(child);
        assert_eq!(parent.accounts[&address], Hash256::new([2; 32]));
        assert_eq!(parent.len(), 2);
        assert!(!parent.is_empty());
    }
}

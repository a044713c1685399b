//! Stake and lending sub-ledgers, persisted apart from the account.

use std::collections::BTreeMap;

use ldvm_primitives::{from_canonical_slice, to_canonical_vec, Address, BigUint, Key};
use ldvm_store::{Prefix, Record};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Stake held by one delegator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub amount: BigUint,
    /// Unix time before which the entry cannot be withdrawn.
    pub lock_time: u64,
    /// Key that must co-sign withdrawals and approver changes.
    pub approver: Option<Key>,
}

/// Loan taken by one borrower.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingEntry {
    /// Amount owed as of `update_at`, interest included.
    pub amount: BigUint,
    pub update_at: u64,
    /// Zero means no due time.
    pub due_time: u64,
}

/// Per-account stake and lending ledgers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    pub stake: BTreeMap<Address, StakeEntry>,
    pub lending: BTreeMap<Address, LendingEntry>,
}

impl Record for AccountLedger {
    const PREFIX: Prefix = Prefix::Ledger;
}

impl AccountLedger {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stake.is_empty() && self.lending.is_empty()
    }

    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        Ok(to_canonical_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> LedgerResult<Self> {
        from_canonical_slice(data).map_err(|err| LedgerError::corrupted("ledger", err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_round_trip() {
        let mut ledger = AccountLedger::default();
        assert!(ledger.is_empty());
        ledger.stake.insert(
            Address::new([2u8; 20]),
            StakeEntry {
                amount: BigUint::from(7u64),
                lock_time: 9,
                approver: None,
            },
        );
        ledger.lending.insert(Address::new([3u8; 20]), LendingEntry::default());
        let bytes = ledger.to_bytes().unwrap();
        assert_eq!(AccountLedger::from_bytes(&bytes).unwrap(), ledger);
        assert_eq!(AccountLedger::from_bytes(&bytes).unwrap().to_bytes().unwrap(), bytes);
        assert!(AccountLedger::from_bytes(&bytes[1..]).is_err());
    }
}

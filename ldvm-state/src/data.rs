//! Data records.

use ldvm_primitives::{
    from_canonical_slice, to_canonical_vec, DataId, Key, Keys, ModelId, TxType,
};
use ldvm_store::{Prefix, Record};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// A versioned data record. Version 1 is the first one written; each
/// update moves the previous version under the previous-data prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    pub model_id: ModelId,
    pub version: u64,
    pub threshold: u16,
    pub keepers: Keys,
    pub approver: Option<Key>,
    pub approve_list: Option<Vec<TxType>>,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
    /// Set by deletion or punishment; a deleted record cannot change.
    pub deleted: bool,
    /// Assigned on creation.
    pub id: DataId,
}

impl Record for DataInfo {
    const PREFIX: Prefix = Prefix::Data;
}

impl DataInfo {
    pub fn validate(&self) -> LedgerResult<()> {
        self.keepers.validate()?;
        if self.threshold == 0 || usize::from(self.threshold) > self.keepers.len() {
            return Err(LedgerError::invalid_keepers(format!(
                "invalid threshold, expected 1..={}, got {}",
                self.keepers.len(),
                self.threshold
            )));
        }
        if self.version == 0 {
            return Err(LedgerError::malformed("data", "invalid version 0"));
        }
        if self.approve_list.is_some() && self.approver.is_none() {
            return Err(LedgerError::invalid_keepers("approve list without approver"));
        }
        Ok(())
    }

    #[must_use]
    pub fn satisfy_signing(&self, signers: &Keys) -> bool {
        self.keepers.count_signed(signers) >= usize::from(self.threshold).max(1)
    }

    /// One more signature than the threshold while keepers allow it.
    #[must_use]
    pub fn satisfy_signing_plus(&self, signers: &Keys) -> bool {
        let threshold = usize::from(self.threshold);
        let required = if threshold < self.keepers.len() {
            threshold + 1
        } else {
            threshold
        };
        self.keepers.count_signed(signers) >= required.max(1)
    }

    #[must_use]
    pub fn need_approve(&self, tx_type: TxType) -> bool {
        match (&self.approver, &self.approve_list) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(list)) => list.contains(&tx_type),
        }
    }

    pub fn check_live(&self) -> LedgerResult<()> {
        if self.deleted {
            return Err(LedgerError::rejected(format!("data {} was deleted", self.id)));
        }
        Ok(())
    }

    pub fn check_version(&self, version: u64) -> LedgerResult<()> {
        if self.version != version {
            return Err(LedgerError::rejected(format!(
                "invalid data version, expected {}, got {version}",
                self.version
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        Ok(to_canonical_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> LedgerResult<Self> {
        let info: DataInfo = from_canonical_slice(data)
            .map_err(|err| LedgerError::corrupted("data", err.to_string()))?;
        info.validate()?;
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldvm_primitives::Address;

    fn key(n: u8) -> Key {
        Key::from(Address::new([n; 20]))
    }

    fn data() -> DataInfo {
        DataInfo {
            model_id: ModelId::new([1u8; 20]),
            version: 1,
            threshold: 1,
            keepers: Keys::new(vec![key(1), key(2)]),
            approver: None,
            approve_list: None,
            payload: b"hello".to_vec(),
            deleted: false,
            id: DataId::new([9u8; 20]),
        }
    }

    #[test]
    fn test_signing() {
        let info = data();
        assert!(info.satisfy_signing(&Keys::new(vec![key(2)])));
        assert!(!info.satisfy_signing(&Keys::new(vec![key(3)])));
        assert!(!info.satisfy_signing_plus(&Keys::new(vec![key(2)])));
        assert!(info.satisfy_signing_plus(&Keys::new(vec![key(2), key(1)])));
    }

    #[test]
    fn test_version_and_deleted() {
        let mut info = data();
        assert!(info.check_version(1).is_ok());
        assert!(info.check_version(2).is_err());
        info.deleted = true;
        assert!(info.check_live().is_err());
    }

    #[test]
    fn test_round_trip() {
        let info = data();
        let bytes = info.to_bytes().unwrap();
        assert_eq!(DataInfo::from_bytes(&bytes).unwrap(), info);
        let mut bad = data();
        bad.threshold = 3;
        assert!(DataInfo::from_bytes(&bad.to_bytes().unwrap()).is_err());
    }
}

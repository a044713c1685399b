//! Block body and status.

use std::fmt;

use ldvm_primitives::{canonical_hash, from_canonical_slice, to_canonical_vec, Address, Hash256};
use ldvm_store::{Prefix, Record};
use ldvm_txs::TxEntry;
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};

/// Decision state of a block as seen by the consensus host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockStatus {
    Processing,
    Accepted,
    Rejected,
}

impl BlockStatus {
    #[must_use]
    pub fn is_decided(self) -> bool {
        !matches!(self, BlockStatus::Processing)
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStatus::Processing => f.write_str("processing"),
            BlockStatus::Accepted => f.write_str("accepted"),
            BlockStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// A block. Its id is the hash of its canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub parent: Hash256,
    /// Genesis is height 0
    pub height: u64,
    /// Unix seconds
    pub timestamp: u64,
    /// Root of the state snapshot after executing `txs`
    pub state: Hash256,
    /// Total gas of `txs`
    pub gas: u64,
    pub gas_price: u64,
    /// Parts per thousand
    pub gas_rebate_rate: u64,
    /// Builder, receives the tips
    pub miner: Address,
    pub validators: Vec<Address>,
    pub txs: Vec<TxEntry>,
}

impl Record for Block {
    const PREFIX: Prefix = Prefix::Block;
}

impl Block {
    pub fn id(&self) -> ChainResult<Hash256> {
        Ok(canonical_hash(self)?)
    }

    pub fn to_bytes(&self) -> ChainResult<Vec<u8>> {
        Ok(to_canonical_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> ChainResult<Self> {
        from_canonical_slice(data).map_err(|err| ChainError::InvalidBlock(err.to_string()))
    }

    /// Ids of every transaction in body order, batch members flattened.
    pub fn tx_ids(&self) -> ChainResult<Vec<Hash256>> {
        let mut ids = Vec::new();
        for entry in &self.txs {
            for tx in entry.transactions() {
                ids.push(tx.id()?);
            }
        }
        Ok(ids)
    }

    /// Checks that do not need the parent.
    pub fn validate_basic(&self) -> ChainResult<()> {
        if self.height == 0 {
            if !self.parent.is_zero() {
                return Err(ChainError::InvalidBlock(
                    "genesis block must have a zero parent".into(),
                ));
            }
            return Ok(());
        }
        if self.parent.is_zero() {
            return Err(ChainError::InvalidBlock(format!(
                "block at height {} has a zero parent",
                self.height
            )));
        }
        if self.txs.is_empty() {
            return Err(ChainError::InvalidBlock("block has no transactions".into()));
        }
        if self.gas_rebate_rate > 1000 {
            return Err(ChainError::InvalidBlock(format!(
                "gas rebate rate {} exceeds 1000",
                self.gas_rebate_rate
            )));
        }
        let mut validators = self.validators.clone();
        validators.sort_unstable();
        validators.dedup();
        if validators.len() != self.validators.len() {
            return Err(ChainError::InvalidBlock("duplicate validators".into()));
        }
        Ok(())
    }
}

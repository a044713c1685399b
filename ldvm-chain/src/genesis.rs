//! Genesis block construction.

use std::sync::Arc;

use ldvm_config::ChainConfig;
use ldvm_primitives::{Address, BigUint, Hash256, Key, Keys, TokenSymbol};
use ldvm_state::{ModelInfo, ModelKind};
use ldvm_store::{Store, VersionDb};
use ldvm_txs::BlockContext;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::block::Block;
use crate::error::{ChainError, ChainResult};
use crate::state::{BlockEnv, BlockState};

/// Native balance granted at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub address: Address,
    /// Nano-LDC
    pub balance: u64,
}

/// Initial state of a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// Unix seconds
    #[serde(default)]
    pub timestamp: u64,

    #[serde(default)]
    pub alloc: Vec<Allocation>,

    /// Keepers of the native token account; they sign punishments
    #[serde(default)]
    pub native_keepers: Vec<Address>,

    #[serde(default)]
    pub native_threshold: u16,
}

impl Genesis {
    /// Executes the genesis allocation into a pending state and returns the
    /// block with its state, saved but not committed.
    pub fn build(&self, config: &ChainConfig, store: Arc<dyn Store>) -> ChainResult<(Block, BlockState)> {
        if usize::from(self.native_threshold) > self.native_keepers.len() {
            return Err(ChainError::InvalidBlock(format!(
                "genesis threshold {} exceeds {} keepers",
                self.native_threshold,
                self.native_keepers.len()
            )));
        }
        let fee = config.fee(0).clone();
        let env = BlockEnv {
            chain_id: config.effective_chain_id(),
            height: 0,
            timestamp: self.timestamp,
            gas_price: fee.min_gas_price,
            miner: Address::ZERO,
            fee,
        };
        let gas_price = env.gas_price;
        let gas_rebate_rate = env.fee.gas_rebate_rate;
        let state = BlockState::new(VersionDb::new(store).child(), env, Hash256::ZERO);

        for kind in ModelKind::ALL {
            state.save_model(&ModelInfo::builtin(kind))?;
        }
        for alloc in &self.alloc {
            let handle = state.load_account(&alloc.address)?;
            handle
                .write()
                .add(&TokenSymbol::NATIVE, &BigUint::from(alloc.balance))?;
        }
        if !self.native_keepers.is_empty() {
            let handle = state.load_account(&Address::NATIVE_TOKEN)?;
            let mut authority = handle.write();
            authority.keepers = self.native_keepers.iter().copied().map(Key::from).collect::<Keys>();
            authority.threshold = self.native_threshold;
        }

        let block = Block {
            parent: Hash256::ZERO,
            height: 0,
            timestamp: self.timestamp,
            state: state.state_root()?,
            gas: 0,
            gas_price,
            gas_rebate_rate,
            miner: Address::ZERO,
            validators: Vec::new(),
            txs: Vec::new(),
        };
        let id = state.save_block(&block)?;
        info!(%id, accounts = self.alloc.len(), "genesis block built");
        Ok((block, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldvm_primitives::LDC;
    use ldvm_store::MemoryStore;

    #[test]
    fn test_genesis_is_deterministic() {
        let genesis = Genesis {
            timestamp: 1_700_000_000,
            alloc: vec![Allocation {
                address: Address::new([1; 20]),
                balance: 1_000 * LDC,
            }],
            native_keepers: vec![Address::new([2; 20])],
            native_threshold: 1,
        };
        let config = ChainConfig::default();
        let (a, state) = genesis.build(&config, Arc::new(MemoryStore::new())).unwrap();
        let (b, _) = genesis.build(&config, Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id().unwrap(), b.id().unwrap());

        let account = state.account(&Address::new([1; 20])).unwrap();
        assert_eq!(account.balance, BigUint::from(1_000 * LDC));
        let authority = state.account(&Address::NATIVE_TOKEN).unwrap();
        assert_eq!(authority.threshold, 1);
        for kind in ModelKind::ALL {
            assert!(state.load_model(&ModelInfo::builtin(kind).id).unwrap().is_some());
        }
    }

    #[test]
    fn test_threshold_above_keepers() {
        let genesis = Genesis {
            native_threshold: 1,
            ..Genesis::default()
        };
        assert!(genesis
            .build(&ChainConfig::default(), Arc::new(MemoryStore::new()))
            .is_err());
    }
}

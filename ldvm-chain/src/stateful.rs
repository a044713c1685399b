//! Blocks as driven by the consensus host.

use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use ldvm_config::FeeConfig;
use ldvm_primitives::{sha3_256, Hash256, SignerRecovery};
use ldvm_txs::TxOrBatch;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::block::{Block, BlockStatus};
use crate::chain::{ChainHandle, ChainInner};
use crate::error::{ChainError, ChainResult};
use crate::state::{BlockEnv, BlockState};
use crate::MAX_TIME_DRIFT_SECS;

/// What the consensus host needs from a block.
///
/// The host calls `verify` only after the parent verified, and decides
/// every block exactly once with `accept` or `reject`.
pub trait ConsensusBlock {
    fn id(&self) -> Hash256;

    fn parent(&self) -> Hash256;

    fn height(&self) -> u64;

    fn timestamp(&self) -> u64;

    /// Canonical bytes of the block.
    fn bytes(&self) -> &[u8];

    fn status(&self) -> BlockStatus;

    /// Executes the block on top of its parent's state.
    fn verify(&self) -> ChainResult<()>;

    /// Commits the executed state and marks the transactions included.
    fn accept(&self) -> ChainResult<()>;

    /// Discards the executed state and hands the transactions back to the
    /// pool.
    fn reject(&self) -> ChainResult<()>;
}

/// A block together with its decoded transactions and, once verified, its
/// executed state.
pub struct StatefulBlock {
    block: Block,
    id: Hash256,
    bytes: Vec<u8>,
    entries: Vec<TxOrBatch>,
    status: RwLock<BlockStatus>,
    state: RwLock<Option<Arc<BlockState>>>,
    chain: Weak<ChainInner>,
}

impl StatefulBlock {
    pub(crate) fn new(
        block: Block,
        bytes: Vec<u8>,
        entries: Vec<TxOrBatch>,
        status: BlockStatus,
        state: Option<Arc<BlockState>>,
        chain: Weak<ChainInner>,
    ) -> Self {
        Self {
            id: sha3_256(&bytes),
            block,
            bytes,
            entries,
            status: RwLock::new(status),
            state: RwLock::new(state),
            chain,
        }
    }

    /// Decodes every entry of the body, running the stateless checks.
    pub(crate) fn decode_entries(
        block: &Block,
        recovery: &dyn SignerRecovery,
    ) -> ChainResult<Vec<TxOrBatch>> {
        block
            .txs
            .iter()
            .map(|entry| TxOrBatch::decode(entry.clone(), recovery).map_err(ChainError::from))
            .collect()
    }

    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    #[must_use]
    pub fn entries(&self) -> &[TxOrBatch] {
        &self.entries
    }

    /// Executed state, present once verified and until rejected.
    #[must_use]
    pub fn state(&self) -> Option<Arc<BlockState>> {
        self.state.read().clone()
    }

    fn chain(&self) -> ChainResult<ChainHandle> {
        self.chain
            .upgrade()
            .map(ChainHandle::from_inner)
            .ok_or(ChainError::Closed)
    }

    fn ensure_processing(&self, operation: &'static str) -> ChainResult<()> {
        let status = self.status();
        if status != BlockStatus::Processing {
            return Err(ChainError::InvalidStatus {
                id: self.id,
                status,
                operation,
            });
        }
        Ok(())
    }

    /// Header checks against the parent. Returns the environment the body
    /// executes in.
    fn check_header(&self, parent: &StatefulBlock, chain_id: u64, fee: &FeeConfig) -> ChainResult<BlockEnv> {
        let block = &self.block;
        block.validate_basic()?;
        if block.height != parent.height() + 1 {
            return Err(ChainError::InvalidHeight {
                expected: parent.height() + 1,
                actual: block.height,
            });
        }
        if block.timestamp < parent.timestamp() {
            return Err(ChainError::InvalidTimestamp(format!(
                "{} is before parent timestamp {}",
                block.timestamp,
                parent.timestamp()
            )));
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if block.timestamp > now + MAX_TIME_DRIFT_SECS {
            return Err(ChainError::InvalidTimestamp(format!(
                "{} is too far in the future",
                block.timestamp
            )));
        }
        let gas_price = fee.next_gas_price(parent.block.gas_price, parent.block.gas);
        if block.gas_price != gas_price {
            return Err(ChainError::InvalidHeader {
                field: "gas_price",
                expected: gas_price,
                actual: block.gas_price,
            });
        }
        if block.gas_rebate_rate != fee.gas_rebate_rate {
            return Err(ChainError::InvalidHeader {
                field: "gas_rebate_rate",
                expected: fee.gas_rebate_rate,
                actual: block.gas_rebate_rate,
            });
        }
        let size: u64 = self.entries.iter().map(TxOrBatch::size).sum();
        if size > fee.max_block_tx_bytes {
            return Err(ChainError::InvalidBlock(format!(
                "transactions take {size} bytes, limit {}",
                fee.max_block_tx_bytes
            )));
        }
        Ok(BlockEnv {
            chain_id,
            height: block.height,
            timestamp: block.timestamp,
            gas_price: block.gas_price,
            miner: block.miner,
            fee: fee.clone(),
        })
    }

    fn execute(&self, state: &BlockState) -> ChainResult<()> {
        let mut gas = 0u64;
        // one child state per entry, as the builder does
        for entry in &self.entries {
            let child = state.derive_state()?;
            if let Err(err) = entry.execute(&child) {
                child.discard()?;
                warn!(block = %self.id, tx = %entry.id(), error = %err, "transaction failed in block");
                return Err(err.into());
            }
            state.absorb(child)?;
            gas = gas.saturating_add(entry.gas());
        }
        if gas != self.block.gas {
            return Err(ChainError::InvalidHeader {
                field: "gas",
                expected: gas,
                actual: self.block.gas,
            });
        }
        state.save_block(&self.block)?;
        Ok(())
    }
}

impl ConsensusBlock for StatefulBlock {
    fn id(&self) -> Hash256 {
        self.id
    }

    fn parent(&self) -> Hash256 {
        self.block.parent
    }

    fn height(&self) -> u64 {
        self.block.height
    }

    fn timestamp(&self) -> u64 {
        self.block.timestamp
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn status(&self) -> BlockStatus {
        *self.status.read()
    }

    fn verify(&self) -> ChainResult<()> {
        self.ensure_processing("verify")?;
        if self.state.read().is_some() {
            return Ok(());
        }
        let chain = self.chain()?;
        let parent = chain.get_block(&self.block.parent)?;
        let parent_state = parent
            .state()
            .ok_or(ChainError::ParentNotVerified(parent.id()))?;
        let config = chain.config();
        let env = self.check_header(&parent, config.effective_chain_id(), config.fee(self.block.height))?;

        let state = parent_state.derive_block(env)?;
        if let Err(err) = self.execute(&state) {
            state.discard()?;
            return Err(err);
        }
        *self.state.write() = Some(Arc::new(state));
        debug!(id = %self.id, height = self.block.height, txs = self.entries.len(), "block verified");
        Ok(())
    }

    fn accept(&self) -> ChainResult<()> {
        self.ensure_processing("accept")?;
        let state = self.state().ok_or(ChainError::InvalidStatus {
            id: self.id,
            status: BlockStatus::Processing,
            operation: "accept before verify",
        })?;
        let chain = self.chain()?;
        let last_accepted = chain.last_accepted().id();
        if self.block.parent != last_accepted {
            return Err(ChainError::NotNextBlock {
                id: self.id,
                last_accepted,
            });
        }

        state.commit()?;
        *self.status.write() = BlockStatus::Accepted;
        let ids: Vec<Hash256> = self.entries.iter().map(TxOrBatch::id).collect();
        chain.pool().set_included(self.block.height, &ids);
        chain.mark_accepted(&self.id)?;
        info!(id = %self.id, height = self.block.height, txs = ids.len(), gas = self.block.gas, "block accepted");
        Ok(())
    }

    fn reject(&self) -> ChainResult<()> {
        match self.status() {
            BlockStatus::Rejected => return Ok(()),
            BlockStatus::Accepted => {
                return Err(ChainError::InvalidStatus {
                    id: self.id,
                    status: BlockStatus::Accepted,
                    operation: "reject",
                })
            }
            BlockStatus::Processing => {}
        }
        if let Some(state) = self.state.write().take() {
            state.discard()?;
        }
        *self.status.write() = BlockStatus::Rejected;
        let chain = self.chain()?;
        chain.remove_block(&self.id);
        let returned = chain.pool().add_local(self.entries.clone());
        warn!(id = %self.id, height = self.block.height, returned, "block rejected");
        Ok(())
    }
}

impl std::fmt::Debug for StatefulBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulBlock")
            .field("id", &self.id)
            .field("height", &self.block.height)
            .field("status", &self.status())
            .field("txs", &self.entries.len())
            .finish()
    }
}

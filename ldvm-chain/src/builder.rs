//! Block building from pooled transactions.

use std::sync::Arc;

use ldvm_txs::TxOrBatch;
use tracing::{debug, info, trace};

use crate::block::{Block, BlockStatus};
use crate::chain::ChainHandle;
use crate::error::{ChainError, ChainResult};
use crate::state::{BlockEnv, BlockState};
use crate::stateful::{ConsensusBlock, StatefulBlock};

/// Fills blocks on top of the preferred block.
///
/// Each pooled entry executes in its own child state and is absorbed only
/// when it succeeds. Permanently invalid entries are rejected in the pool;
/// entries that may succeed later go back to it.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    chain: ChainHandle,
}

impl BlockBuilder {
    #[must_use]
    pub fn new(chain: ChainHandle) -> Self {
        Self { chain }
    }

    /// Waits until the pool holds something to build from.
    pub async fn wait_for_txs(&self) {
        let notify = self.chain.pool().notifier();
        while self.chain.pool().is_empty() {
            notify.notified().await;
        }
    }

    /// Builds and verifies the next block. `timestamp` is raised to the
    /// parent's when it is earlier.
    pub fn build(&self, timestamp: u64) -> ChainResult<Arc<StatefulBlock>> {
        let parent = self.chain.preferred();
        let parent_state = parent
            .state()
            .ok_or(ChainError::ParentNotVerified(parent.id()))?;
        let config = self.chain.config();
        let height = parent.height() + 1;
        let fee = config.fee(height).clone();
        let env = BlockEnv {
            chain_id: config.effective_chain_id(),
            height,
            timestamp: timestamp.max(parent.timestamp()),
            gas_price: fee.next_gas_price(parent.block().gas_price, parent.block().gas),
            miner: self.chain.miner(),
            fee,
        };
        let state = parent_state.derive_block(env.clone())?;

        let (included, gas) = match self.fill(&state, env.fee.max_block_tx_bytes) {
            Ok(filled) => filled,
            Err(err) => {
                state.discard()?;
                return Err(err);
            }
        };
        if included.is_empty() {
            state.discard()?;
            return Err(ChainError::NoTransactions);
        }

        let block = Block {
            parent: parent.id(),
            height,
            timestamp: env.timestamp,
            state: Default::default(),
            gas,
            gas_price: env.gas_price,
            gas_rebate_rate: env.fee.gas_rebate_rate,
            miner: env.miner,
            validators: Vec::new(),
            txs: included.iter().map(TxOrBatch::entry).collect(),
        };
        match self.seal(block, state, included.clone()) {
            Ok(built) => Ok(built),
            Err(err) => {
                self.chain.pool().add_local(included);
                Err(err)
            }
        }
    }

    fn seal(
        &self,
        mut block: Block,
        state: BlockState,
        included: Vec<TxOrBatch>,
    ) -> ChainResult<Arc<StatefulBlock>> {
        block.state = state.state_root()?;
        let id = state.save_block(&block)?;
        let bytes = block.to_bytes()?;
        let (height, gas) = (block.height, block.gas);
        let built = Arc::new(StatefulBlock::new(
            block,
            bytes,
            included,
            BlockStatus::Processing,
            Some(Arc::new(state)),
            self.chain.downgrade(),
        ));
        self.chain.insert_block(Arc::clone(&built));
        info!(%id, height, txs = built.entries().len(), gas, "block built");
        Ok(built)
    }

    /// Pops entries until the byte budget is used or the pool runs dry.
    fn fill(&self, state: &BlockState, budget: u64) -> ChainResult<(Vec<TxOrBatch>, u64)> {
        let pool = self.chain.pool();
        let mut included = Vec::new();
        let mut retry = Vec::new();
        let mut remaining = budget;
        let mut gas = 0u64;

        loop {
            let popped = pool.pop_txs_by_size(remaining);
            if popped.is_empty() {
                break;
            }
            for entry in popped {
                let child = state.derive_state()?;
                match entry.execute(&child) {
                    Ok(()) => {
                        state.absorb(child)?;
                        remaining -= entry.size().min(remaining);
                        gas = gas.saturating_add(entry.gas());
                        trace!(tx = %entry.id(), "transaction included");
                        included.push(entry);
                    }
                    Err(err) if err.class().is_fatal() => {
                        child.discard()?;
                        included.push(entry);
                        included.append(&mut retry);
                        pool.add_local(included);
                        return Err(err.into());
                    }
                    Err(err) if err.is_permanent() => {
                        child.discard()?;
                        debug!(tx = %entry.id(), error = %err, "transaction dropped");
                        pool.reject(&entry.id());
                    }
                    Err(err) => {
                        child.discard()?;
                        debug!(tx = %entry.id(), error = %err, "transaction deferred");
                        retry.push(entry);
                    }
                }
            }
        }

        pool.add_local(retry);
        Ok((included, gas))
    }
}

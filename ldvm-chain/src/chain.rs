//! Chain handle: last accepted and preferred blocks, block lookup and
//! reorganization.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use ldvm_config::ChainConfig;
use ldvm_primitives::{sha3_256, Address, Hash256, SignerRecovery};
use ldvm_store::{block_key, height_key, Prefix, Store, LAST_ACCEPTED_KEY};
use ldvm_txpool::TxPool;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::block::{Block, BlockStatus};
use crate::builder::BlockBuilder;
use crate::error::{ChainError, ChainResult};
use crate::genesis::Genesis;
use crate::state::{BlockEnv, BlockState};
use crate::stateful::{ConsensusBlock, StatefulBlock};

pub(crate) struct ChainInner {
    config: ChainConfig,
    store: Arc<dyn Store>,
    pool: Arc<TxPool>,
    recovery: Arc<dyn SignerRecovery>,
    miner: Address,
    /// Undecided blocks by id
    blocks: DashMap<Hash256, Arc<StatefulBlock>>,
    last_accepted: RwLock<Arc<StatefulBlock>>,
    preferred: RwLock<Arc<StatefulBlock>>,
}

/// Shared handle to the chain. Cloning is cheap.
///
/// The last accepted and preferred blocks are swapped as whole `Arc`s, so
/// readers always see a consistent block.
#[derive(Clone)]
pub struct ChainHandle {
    inner: Arc<ChainInner>,
}

impl ChainHandle {
    pub(crate) fn from_inner(inner: Arc<ChainInner>) -> Self {
        Self { inner }
    }

    /// Opens the chain stored in `store`, or initializes it from `genesis`
    /// when the store is empty.
    pub fn open(
        config: ChainConfig,
        store: Arc<dyn Store>,
        genesis: &Genesis,
        pool: Arc<TxPool>,
        recovery: Arc<dyn SignerRecovery>,
        miner: Address,
    ) -> ChainResult<Self> {
        config.validate()?;

        let (block, bytes, state) = match store.get(Prefix::Meta, LAST_ACCEPTED_KEY)? {
            Some(id) => {
                let id = Hash256::from_slice(&id)?;
                let bytes = store
                    .get(Prefix::Block, &block_key(&id))?
                    .ok_or(ChainError::BlockNotFound(id))?;
                let block = Block::from_bytes(&bytes)?;
                let env = Self::env_of(&config, &block);
                let state = BlockState::committed(Arc::clone(&store), env, block.state);
                info!(%id, height = block.height, "chain loaded");
                (block, bytes, state)
            }
            None => {
                let (block, state) = genesis.build(&config, Arc::clone(&store))?;
                state.commit()?;
                let bytes = block.to_bytes()?;
                info!(id = %sha3_256(&bytes), "chain initialized from genesis");
                (block, bytes, state)
            }
        };
        let entries = StatefulBlock::decode_entries(&block, recovery.as_ref())?;
        let state = Arc::new(state);

        let inner = Arc::new_cyclic(|weak| {
            let last = Arc::new(StatefulBlock::new(
                block,
                bytes,
                entries,
                BlockStatus::Accepted,
                Some(state),
                weak.clone(),
            ));
            ChainInner {
                config,
                store,
                pool,
                recovery,
                miner,
                blocks: DashMap::new(),
                last_accepted: RwLock::new(Arc::clone(&last)),
                preferred: RwLock::new(last),
            }
        });
        Ok(Self { inner })
    }

    fn env_of(config: &ChainConfig, block: &Block) -> BlockEnv {
        BlockEnv {
            chain_id: config.effective_chain_id(),
            height: block.height,
            timestamp: block.timestamp,
            gas_price: block.gas_price,
            miner: block.miner,
            fee: config.fee(block.height).clone(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<TxPool> {
        &self.inner.pool
    }

    #[must_use]
    pub fn recovery(&self) -> &dyn SignerRecovery {
        self.inner.recovery.as_ref()
    }

    /// Receiver of the tips of blocks built here.
    #[must_use]
    pub fn miner(&self) -> Address {
        self.inner.miner
    }

    #[must_use]
    pub fn last_accepted(&self) -> Arc<StatefulBlock> {
        Arc::clone(&self.inner.last_accepted.read())
    }

    #[must_use]
    pub fn preferred(&self) -> Arc<StatefulBlock> {
        Arc::clone(&self.inner.preferred.read())
    }

    /// Number of undecided blocks.
    #[must_use]
    pub fn processing(&self) -> usize {
        self.inner.blocks.len()
    }

    /// Looks a block up among the undecided ones, then the accepted ones.
    pub fn get_block(&self, id: &Hash256) -> ChainResult<Arc<StatefulBlock>> {
        if let Some(block) = self.inner.blocks.get(id) {
            return Ok(Arc::clone(block.value()));
        }
        let last = self.last_accepted();
        if last.id() == *id {
            return Ok(last);
        }
        let bytes = self
            .inner
            .store
            .get(Prefix::Block, &block_key(id))?
            .ok_or(ChainError::BlockNotFound(*id))?;
        let block = Block::from_bytes(&bytes)?;
        let entries = StatefulBlock::decode_entries(&block, self.recovery())?;
        Ok(Arc::new(StatefulBlock::new(
            block,
            bytes,
            entries,
            BlockStatus::Accepted,
            None,
            Arc::downgrade(&self.inner),
        )))
    }

    /// Id of the accepted block at `height`.
    pub fn block_id_at_height(&self, height: u64) -> ChainResult<Option<Hash256>> {
        match self.inner.store.get(Prefix::Height, &height_key(height))? {
            Some(id) => Ok(Some(Hash256::from_slice(&id)?)),
            None => Ok(None),
        }
    }

    /// Decodes a block received from the network. Known blocks are returned
    /// as they are.
    pub fn parse_block(&self, bytes: &[u8]) -> ChainResult<Arc<StatefulBlock>> {
        let id = sha3_256(bytes);
        if let Ok(known) = self.get_block(&id) {
            return Ok(known);
        }
        let block = Block::from_bytes(bytes)?;
        block.validate_basic()?;
        let entries = StatefulBlock::decode_entries(&block, self.recovery())?;
        let parsed = Arc::new(StatefulBlock::new(
            block,
            bytes.to_vec(),
            entries,
            BlockStatus::Processing,
            None,
            Arc::downgrade(&self.inner),
        ));
        self.insert_block(Arc::clone(&parsed));
        debug!(%id, height = parsed.height(), "block parsed");
        Ok(parsed)
    }

    /// Builds a block on top of the preferred block from pooled
    /// transactions.
    pub fn build_block(&self, timestamp: u64) -> ChainResult<Arc<StatefulBlock>> {
        BlockBuilder::new(self.clone()).build(timestamp)
    }

    /// Makes `id` the preferred block. Undecided blocks that are only on
    /// the previously preferred branch are rejected in height order and
    /// their transactions return to the pool.
    pub fn set_preference(&self, id: &Hash256) -> ChainResult<()> {
        let target = self.get_block(id)?;
        let current = self.preferred();
        if current.id() == target.id() {
            return Ok(());
        }

        let kept: HashSet<Hash256> = self.branch(&target).iter().map(|b| b.id()).collect();
        let mut abandoned: Vec<Arc<StatefulBlock>> = self
            .branch(&current)
            .into_iter()
            .filter(|block| !kept.contains(&block.id()))
            .collect();
        abandoned.sort_by_key(|block| block.height());

        if !abandoned.is_empty() {
            warn!(
                from = %current.id(),
                to = %target.id(),
                abandoned = abandoned.len(),
                "chain reorganization"
            );
        }
        for block in &abandoned {
            block.reject()?;
        }
        *self.inner.preferred.write() = target;
        debug!(%id, "preference updated");
        Ok(())
    }

    /// Undecided blocks from `tip` back to the last decided ancestor, tip
    /// first.
    fn branch(&self, tip: &Arc<StatefulBlock>) -> Vec<Arc<StatefulBlock>> {
        let mut branch = Vec::new();
        let mut current = Arc::clone(tip);
        while current.status() == BlockStatus::Processing {
            let parent = current.parent();
            branch.push(current);
            match self.inner.blocks.get(&parent) {
                Some(block) => current = Arc::clone(block.value()),
                None => break,
            }
        }
        branch
    }

    pub(crate) fn downgrade(&self) -> Weak<ChainInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn insert_block(&self, block: Arc<StatefulBlock>) {
        self.inner.blocks.insert(block.id(), block);
    }

    pub(crate) fn remove_block(&self, id: &Hash256) {
        self.inner.blocks.remove(id);
    }

    /// Moves an accepted block out of the undecided set. The preferred
    /// block follows when it is not a descendant.
    pub(crate) fn mark_accepted(&self, id: &Hash256) -> ChainResult<()> {
        let (_, block) = self
            .inner
            .blocks
            .remove(id)
            .ok_or(ChainError::BlockNotFound(*id))?;
        let preferred = self.preferred();
        let descends = preferred.id() == *id
            || self
                .branch(&preferred)
                .iter()
                .any(|ancestor| ancestor.parent() == *id);
        if !descends {
            *self.inner.preferred.write() = Arc::clone(&block);
        }
        *self.inner.last_accepted.write() = block;
        Ok(())
    }
}

impl std::fmt::Debug for ChainHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainHandle")
            .field("last_accepted", &self.last_accepted())
            .field("preferred", &self.preferred())
            .field("processing", &self.processing())
            .finish()
    }
}

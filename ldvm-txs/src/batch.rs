//! Atomic batches: several transactions that are included, and succeed or
//! fail, together.

use std::collections::HashSet;

use ldvm_primitives::{Address, Hash256, SignerRecovery};
use tracing::debug;

use crate::context::BlockContext;
use crate::error::{TxError, TxResult};
use crate::transaction::TxEntry;
use crate::tx::{Tx, TxHandler};

/// Two or more transactions executed in order as one unit.
#[derive(Debug, Clone)]
pub struct Batch {
    txs: Vec<Tx>,
}

impl Batch {
    /// Builds a batch. Members must be distinct.
    pub fn new(txs: Vec<Tx>) -> TxResult<Self> {
        if txs.len() < 2 {
            return Err(TxError::batch(format!(
                "expected at least 2 transactions, got {}",
                txs.len()
            )));
        }
        let mut seen = HashSet::with_capacity(txs.len());
        for tx in &txs {
            if !seen.insert(tx.id()) {
                return Err(TxError::batch(format!("duplicate transaction {}", tx.id())));
            }
        }
        Ok(Self { txs })
    }

    #[must_use]
    pub fn txs(&self) -> &[Tx] {
        &self.txs
    }

    /// Member with the highest priority, first on ties.
    fn lead(&self) -> &Tx {
        let mut lead = &self.txs[0];
        for tx in &self.txs[1..] {
            if tx.priority() > lead.priority() {
                lead = tx;
            }
        }
        lead
    }
}

/// One unit the pool and the block builder schedule.
#[derive(Debug, Clone)]
pub enum TxOrBatch {
    Tx(Tx),
    Batch(Batch),
}

impl TxOrBatch {
    /// Decodes a block entry, running the stateless checks of every member.
    pub fn decode(entry: TxEntry, recovery: &dyn SignerRecovery) -> TxResult<Self> {
        match entry {
            TxEntry::Tx(raw) => Tx::decode(raw, recovery).map(TxOrBatch::Tx),
            TxEntry::Batch(raws) => {
                let txs = raws
                    .into_iter()
                    .map(|raw| Tx::decode(raw, recovery))
                    .collect::<TxResult<Vec<_>>>()?;
                Batch::new(txs).map(TxOrBatch::Batch)
            }
        }
    }

    /// The transaction itself, or the highest-priority member of a batch.
    #[must_use]
    pub fn id(&self) -> Hash256 {
        match self {
            TxOrBatch::Tx(tx) => tx.id(),
            TxOrBatch::Batch(batch) => batch.lead().id(),
        }
    }

    #[must_use]
    pub fn is_batch(&self) -> bool {
        matches!(self, TxOrBatch::Batch(_))
    }

    #[must_use]
    pub fn txs(&self) -> &[Tx] {
        match self {
            TxOrBatch::Tx(tx) => std::slice::from_ref(tx),
            TxOrBatch::Batch(batch) => batch.txs(),
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.txs().iter().map(Tx::size).sum()
    }

    #[must_use]
    pub fn gas(&self) -> u64 {
        self.txs().iter().map(Tx::gas).sum()
    }

    #[must_use]
    pub fn priority(&self) -> u64 {
        self.txs().iter().map(Tx::priority).max().unwrap_or_default()
    }

    /// Sender of the first member.
    #[must_use]
    pub fn sender(&self) -> Address {
        self.txs()[0].from()
    }

    /// Nonce of the first member.
    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.txs()[0].nonce()
    }

    /// Wire form for a block body.
    #[must_use]
    pub fn entry(&self) -> TxEntry {
        match self {
            TxOrBatch::Tx(tx) => TxEntry::Tx(tx.raw().clone()),
            TxOrBatch::Batch(batch) => {
                TxEntry::Batch(batch.txs().iter().map(|tx| tx.raw().clone()).collect())
            }
        }
    }

    /// Verifies and accepts every member in order. Members see the effects
    /// of the ones before them; the caller discards all of them on error.
    pub fn execute(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        for tx in self.txs() {
            tx.verify(ctx)?;
            tx.accept(ctx)?;
        }
        if let TxOrBatch::Batch(batch) = self {
            debug!(batch = %self.id(), txs = batch.txs().len(), "batch executed");
        }
        Ok(())
    }
}

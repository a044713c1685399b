//! # LDVM
//!
//! Ledger core of the LDVM chain: accounts and their ledgers, the
//! transaction pipeline, block state over a versioned store and the
//! transaction pool.
//!
//! The workspace crates are re-exported here:
//!
//! - [`primitives`] - ids, addresses, symbols, keys, canonical CBOR
//! - [`config`] - fee and chain configuration, plus the node config file
//! - [`store`] - key-value stores and the versioned overlay
//! - [`state`] - accounts, models, data and name records
//! - [`txs`] - transaction kinds and their execution
//! - [`txpool`] - pending transactions and block selection
//! - [`chain`] - block state, consensus blocks and block building
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ldvm::{open_chain, NodeConfig};
//! use ldvm::primitives::Address;
//! use ldvm::store::MemoryStore;
//!
//! let config = NodeConfig::default();
//! let chain = open_chain(&config, Arc::new(MemoryStore::new()), Address::ZERO).unwrap();
//! assert_eq!(chain.last_accepted().block().height, 0);
//! ```

#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::Context;

pub use ldvm_chain as chain;
pub use ldvm_primitives as primitives;
pub use ldvm_state as state;
pub use ldvm_store as store;
pub use ldvm_txpool as txpool;
pub use ldvm_txs as txs;

/// Chain configuration and the node configuration file.
pub mod config {
    pub use ldvm_config::*;

    mod node;
    pub use node::NodeConfig;
}

pub mod logging;

pub use config::NodeConfig;

/// Opens the chain in `store`, initializing it from the configured genesis
/// when the store is empty, with a fresh transaction pool.
pub fn open_chain(
    config: &NodeConfig,
    store: Arc<dyn store::Store>,
    miner: primitives::Address,
) -> anyhow::Result<chain::ChainHandle> {
    config.validate()?;
    let pool = Arc::new(txpool::TxPool::new(config.txpool.clone()));
    let handle = chain::ChainHandle::open(
        config.chain.clone(),
        store,
        &config.genesis,
        pool,
        Arc::new(primitives::DefaultRecovery),
        miner,
    )
    .context("failed to open chain")?;
    tracing::info!(
        chain_id = config.chain.effective_chain_id(),
        height = handle.last_accepted().block().height,
        "chain opened"
    );
    Ok(handle)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

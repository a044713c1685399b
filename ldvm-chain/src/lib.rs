//! # LDVM Chain
//!
//! Block-scoped state and chain management for the LDVM ledger.
//!
//! - [`BlockState`]: executes one block over a versioned overlay, caches
//!   accounts and accumulates the [`StateSnapshot`] whose id is the state
//!   root
//! - [`StatefulBlock`]: a block as driven by the consensus host through
//!   [`ConsensusBlock`]
//! - [`ChainHandle`]: owns the last accepted and preferred blocks and
//!   rejects abandoned branches on reorganization
//! - [`BlockBuilder`]: fills blocks from the transaction pool
//!
//! A block's state is derived from its parent's, so a block can be built
//! and verified on top of a parent that is still undecided. Accepting
//! commits the state; rejecting discards it and returns the transactions
//! to the pool.

mod block;
mod builder;
mod chain;
mod error;
mod genesis;
mod snapshot;
mod state;
mod stateful;

pub use block::{Block, BlockStatus};
pub use builder::BlockBuilder;
pub use chain::ChainHandle;
pub use error::{ChainError, ChainResult};
pub use genesis::{Allocation, Genesis};
pub use snapshot::StateSnapshot;
pub use state::{BlockEnv, BlockState};
pub use stateful::{ConsensusBlock, StatefulBlock};

/// Genesis block height
pub const GENESIS_HEIGHT: u64 = 0;

/// Maximum allowed block time drift (in seconds)
pub const MAX_TIME_DRIFT_SECS: u64 = 15 * 60;

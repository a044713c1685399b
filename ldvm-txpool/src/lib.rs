//! # LDVM Transaction Pool
//!
//! Holds transactions and batches that are not yet in a block:
//!
//! - an order-preserving queue with an id set for membership tests
//! - a TTL-bounded memory of ids that left the queue (pending, rejected or
//!   included) so they are not admitted again
//! - [`TxPool::pop_txs_by_size`], the byte-budgeted selection used by the
//!   block builder
//!
//! ## Example
//!
//! ```rust
//! use ldvm_txpool::{TxPool, TxPoolConfig};
//! use ldvm_txs::TxOrBatch;
//!
//! let pool: TxPool<TxOrBatch> = TxPool::new(TxPoolConfig::default());
//! assert!(pool.is_empty());
//! assert!(pool.pop_txs_by_size(1024).is_empty());
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod known;
pub mod pool;

pub use config::TxPoolConfig;
pub use entry::PoolItem;
pub use error::{PoolError, PoolResult};
pub use known::KnownStatus;
pub use pool::{PoolStats, TxPool};

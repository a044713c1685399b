//! Storage abstractions backing the LDVM ledger.
//!
//! The crate exposes an in-memory implementation used for tests and
//! deterministic simulations, plus a Sled-backed persistent store (feature
//! `sled`). Both implement the [`Store`] trait. Keys are grouped by the
//! one-byte [`Prefix`] of their record category, and [`VersionDb`] layers
//! block-scoped overlays on top of a store.

mod error;
mod memory;
mod prefix;
#[cfg(feature = "sled")] mod sled_store;
mod traits;
mod version;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use prefix::{
    account_key, block_key, data_key, height_key, model_key, name_key, prev_data_key, Prefix,
    Record, LAST_ACCEPTED_KEY,
};
#[cfg(feature = "sled")] pub use sled_store::SledStore;
pub use traits::{decode_record, BatchOp, Store, StoreExt, WriteBatch};
pub use version::VersionDb;

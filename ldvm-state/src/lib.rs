//! # LDVM State
//!
//! Ledger objects owned by a block while it executes:
//!
//! - [`Account`]: balances, nonce, nonce table, keepers, and the token,
//!   stake and lending lifecycles
//! - [`AccountLedger`]: stake and lending sub-ledgers persisted beside it
//! - [`ModelInfo`], [`DataInfo`], [`NameRecord`]: model and data records
//!
//! Every object has a canonical byte form; decoding re-validates it.

pub mod account;
pub mod config;
pub mod data;
pub mod error;
pub mod ledger;
pub mod lending;
pub mod model;
pub mod name;
pub mod stake;
pub mod token;

pub use account::{Account, AccountKind};
pub use config::{AccountConfig, LendingConfig, StakeConfig, StakeType};
pub use data::DataInfo;
pub use error::{LedgerError, LedgerResult};
pub use ledger::{AccountLedger, LendingEntry, StakeEntry};
pub use lending::amount_owed;
pub use model::{ModelInfo, ModelKind};
pub use name::{validate_name, NameRecord};

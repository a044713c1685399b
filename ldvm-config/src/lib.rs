//! # LDVM Config
//!
//! Chain configuration for the LDVM ledger: the network type, the chain id
//! and the height-scoped [`FeeConfig`] schedule consulted by transaction
//! verification and block building.

pub mod chain;
pub mod error;
pub mod fee;
pub mod network;

pub use chain::ChainConfig;
pub use error::{ConfigError, ConfigResult};
pub use fee::FeeConfig;
pub use network::NetworkType;

//! # LDVM Transactions
//!
//! Every transaction kind of the LDVM ledger and the pipeline they share:
//!
//! 1. [`Tx::decode`] checks the envelope, recovers signers and runs the
//!    stateless `syntactic_verify` of the kind;
//! 2. [`TxHandler::verify`] checks the transaction against a
//!    [`BlockContext`] without changing it;
//! 3. [`TxHandler::accept`] charges fees and applies the transaction.
//!
//! Fees: `gas = base_gas + size`, the sender pays `gas * gas_price` (burned
//! into the native token account) plus `gas * min(gas_tip, gas_fee_cap -
//! gas_price)` (paid to the miner).
//!
//! [`TxOrBatch`] groups transactions that must execute atomically.

pub mod base;
pub mod batch;
pub mod context;
pub mod error;
pub mod handlers;
pub mod payload;
pub mod transaction;
pub mod tx;

pub use base::{sender_allowed, Fees, TxBase};
pub use batch::{Batch, TxOrBatch};
pub use context::{AccountHandle, BlockContext};
pub use error::{TxError, TxResult};
pub use payload::{decode_payload, encode_payload};
pub use transaction::{Transaction, TxData, TxEntry};
pub use tx::{Tx, TxHandler};

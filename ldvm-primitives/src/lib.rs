//! # LDVM Primitives
//!
//! Leaf types shared by every LDVM crate:
//! - [`Address`], [`Hash256`], [`ModelId`], [`DataId`]: fixed-length ids
//! - [`TokenSymbol`], [`StakeSymbol`]: symbols that double as account addresses
//! - [`Key`], [`Keys`], [`Signature`]: signer keys and M-of-N key sets
//! - [`SignerRecovery`]: the signature verification capability
//! - [`codec`]: canonical CBOR encoding, the only encoding that is hashed
//! - [`TxType`]: transaction kind tags and their base gas
//!
//! ## Example
//!
//! ```rust
//! use ldvm_primitives::{Address, TokenSymbol};
//!
//! let token = TokenSymbol::new("$LDC").unwrap();
//! assert_eq!(TokenSymbol::from_address(&token.to_address()), Some(token));
//! assert!(Address::ZERO.is_zero());
//! ```

pub mod amount;
pub mod codec;
pub mod constants;
pub mod error;
pub mod hash;
pub mod id;
pub mod signer;
pub mod symbol;
pub mod tx_type;

pub use amount::{mul_ppm, Amount};
pub use codec::{canonical_hash, from_canonical_slice, to_canonical_vec};
pub use constants::*;
pub use error::{ErrorClass, PrimitiveError, PrimitiveResult};
pub use hash::{keccak256, sha3_256};
pub use id::{Address, DataId, Hash256, ModelId};
pub use signer::{DefaultRecovery, Key, KeyKind, Keys, LocalSigner, Signature, SignerRecovery};
pub use symbol::{StakeSymbol, TokenSymbol};
pub use tx_type::TxType;

pub use num_bigint::BigUint;

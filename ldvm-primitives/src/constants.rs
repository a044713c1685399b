//! Ledger-wide constants.

/// Smallest unit of the native token.
pub const NANO_LDC: u64 = 1;

/// 10^3 nano LDC.
pub const MICRO_LDC: u64 = 1_000;

/// 10^6 nano LDC.
pub const MILLI_LDC: u64 = 1_000_000;

/// One native token, 10^9 nano LDC.
pub const LDC: u64 = 1_000_000_000;

/// Display name of the native token.
pub const NATIVE_TOKEN_NAME: &str = "NativeLDC";

/// Size of an account address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Size of a transaction, block or state hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Maximum number of keepers on an account, model or data record.
pub const MAX_KEEPERS: usize = 1024;

/// Maximum number of live expiry groups in an account nonce table.
pub const MAX_NONCE_GROUPS: usize = 64;

/// Maximum number of nonces registered by one nonce-table update.
pub const MAX_NONCES_PER_GROUP: usize = 1024;

/// Withdraw and interest rates are expressed in parts per million.
pub const PPM: u64 = 1_000_000;

/// Seconds in one day, the accrual period of lending interest.
pub const SECONDS_PER_DAY: u64 = 86_400;

//! Big-integer amounts.

use num_bigint::BigUint;

use crate::constants::PPM;

/// Balance or transfer amount, always non-negative.
pub type Amount = BigUint;

/// `amount * rate / 1_000_000`, rounded down.
#[must_use]
pub fn mul_ppm(amount: &BigUint, rate: u64) -> BigUint {
    amount * BigUint::from(rate) / BigUint::from(PPM)
}

/// Parses a decimal amount string.
#[must_use]
pub fn parse_amount(s: &str) -> Option<BigUint> {
    s.parse::<BigUint>().ok()
}

//! Token and stake symbols.
//!
//! A symbol is a 20-byte value holding a short right-aligned ASCII name
//! (`$LDC`, `#POOL`). The bytes of a valid symbol double as the address of
//! the account that manages it, so a token account lives at the address
//! spelled by its symbol.

use std::fmt;
use std::str::FromStr;

use crate::constants::{ADDRESS_SIZE, NATIVE_TOKEN_NAME};
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::id::{impl_bytes_serde, Address};

const TOKEN_PREFIX: u8 = b'$';
const STAKE_PREFIX: u8 = b'#';
const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 10;

fn valid_symbol(bytes: &[u8; ADDRESS_SIZE], prefix: u8) -> bool {
    let Some(start) = bytes.iter().position(|b| *b != 0) else {
        return false;
    };
    let body = &bytes[start..];
    if body[0] != prefix {
        return false;
    }
    let name = &body[1..];
    if name.len() < MIN_NAME_LEN || name.len() > MAX_NAME_LEN {
        return false;
    }
    name[0].is_ascii_uppercase()
        && name
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

fn encode_symbol(s: &str, prefix: u8) -> PrimitiveResult<[u8; ADDRESS_SIZE]> {
    let raw = s.as_bytes();
    if raw.is_empty() || raw.len() > ADDRESS_SIZE || raw[0] != prefix {
        return Err(PrimitiveError::InvalidSymbol {
            symbol: s.to_string(),
        });
    }
    let mut bytes = [0u8; ADDRESS_SIZE];
    bytes[ADDRESS_SIZE - raw.len()..].copy_from_slice(raw);
    if !valid_symbol(&bytes, prefix) {
        return Err(PrimitiveError::InvalidSymbol {
            symbol: s.to_string(),
        });
    }
    Ok(bytes)
}

fn symbol_text(bytes: &[u8; ADDRESS_SIZE]) -> &str {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(ADDRESS_SIZE);
    std::str::from_utf8(&bytes[start..]).unwrap_or("")
}

/// Symbol of a fungible token. The zero value is the native token.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenSymbol(pub [u8; ADDRESS_SIZE]);

impl TokenSymbol {
    /// The native token.
    pub const NATIVE: Self = Self([0u8; ADDRESS_SIZE]);

    /// Parses a `$NAME` symbol.
    pub fn new(s: &str) -> PrimitiveResult<Self> {
        encode_symbol(s, TOKEN_PREFIX).map(Self)
    }

    #[inline]
    #[must_use]
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Native, or a well-formed `$NAME` symbol.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_native() || valid_symbol(&self.0, TOKEN_PREFIX)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_slice(value: &[u8]) -> PrimitiveResult<Self> {
        let addr = Address::from_slice(value)?;
        Ok(Self(addr.0))
    }

    /// Interprets an account address as a token symbol.
    #[must_use]
    pub fn from_address(address: &Address) -> Option<Self> {
        let symbol = Self(address.0);
        symbol.is_valid().then_some(symbol)
    }

    /// Address of the account managing this token.
    #[must_use]
    pub fn to_address(&self) -> Address {
        Address::new(self.0)
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            f.write_str(NATIVE_TOKEN_NAME)
        } else if valid_symbol(&self.0, TOKEN_PREFIX) {
            f.write_str(symbol_text(&self.0))
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

impl fmt::Debug for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenSymbol({self})")
    }
}

impl FromStr for TokenSymbol {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == NATIVE_TOKEN_NAME || s.is_empty() {
            return Ok(Self::NATIVE);
        }
        if let Some(hex_str) = s.strip_prefix("0x") {
            let addr = Address::parse(hex_str)?;
            let symbol = Self(addr.0);
            if !symbol.is_valid() {
                return Err(PrimitiveError::InvalidSymbol {
                    symbol: s.to_string(),
                });
            }
            return Ok(symbol);
        }
        Self::new(s)
    }
}

impl_bytes_serde!(TokenSymbol, ADDRESS_SIZE);

/// Symbol of a stake pool, `#NAME`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StakeSymbol(pub [u8; ADDRESS_SIZE]);

impl StakeSymbol {
    /// Parses a `#NAME` symbol.
    pub fn new(s: &str) -> PrimitiveResult<Self> {
        encode_symbol(s, STAKE_PREFIX).map(Self)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        valid_symbol(&self.0, STAKE_PREFIX)
    }

    pub fn from_slice(value: &[u8]) -> PrimitiveResult<Self> {
        let addr = Address::from_slice(value)?;
        Ok(Self(addr.0))
    }

    #[must_use]
    pub fn from_address(address: &Address) -> Option<Self> {
        let symbol = Self(address.0);
        symbol.is_valid().then_some(symbol)
    }

    #[must_use]
    pub fn to_address(&self) -> Address {
        Address::new(self.0)
    }
}

impl fmt::Display for StakeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            f.write_str(symbol_text(&self.0))
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

impl fmt::Debug for StakeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StakeSymbol({self})")
    }
}

impl FromStr for StakeSymbol {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl_bytes_serde!(StakeSymbol, ADDRESS_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_symbol_round_trip() {
        let ldc = TokenSymbol::new("$LDC").unwrap();
        assert!(ldc.is_valid());
        assert!(!ldc.is_native());
        assert_eq!(ldc.to_string(), "$LDC");
        assert_eq!(&ldc.0[16..], b"$LDC");
        assert!(ldc.0[..16].iter().all(|b| *b == 0));
        assert_eq!("$LDC".parse::<TokenSymbol>().unwrap(), ldc);
    }

    #[test]
    fn test_native_symbol() {
        assert!(TokenSymbol::NATIVE.is_valid());
        assert_eq!(TokenSymbol::NATIVE.to_string(), "NativeLDC");
        assert_eq!(
            "NativeLDC".parse::<TokenSymbol>().unwrap(),
            TokenSymbol::NATIVE
        );
        assert_eq!(TokenSymbol::NATIVE.to_address(), Address::NATIVE_TOKEN);
    }

    #[test]
    fn test_invalid_symbols() {
        for s in ["LDC", "$", "$L", "$ldc", "$1AB", "$ABCDEFGHIJK", "$AB-C", "#LDC"] {
            assert!(TokenSymbol::new(s).is_err(), "{s} should be rejected");
        }
        let mut bytes = [0u8; 20];
        bytes[0] = b'$';
        bytes[1] = b'A';
        bytes[2] = b'B';
        // embedded zero bytes after the name are not allowed
        assert!(!TokenSymbol(bytes).is_valid());
    }

    #[test]
    fn test_stake_symbol() {
        let pool = StakeSymbol::new("#POOL1").unwrap();
        assert!(pool.is_valid());
        assert_eq!(pool.to_string(), "#POOL1");
        assert!(TokenSymbol::from_address(&pool.to_address()).is_none());
        assert_eq!(StakeSymbol::from_address(&pool.to_address()), Some(pool));
        assert!(StakeSymbol::new("$POOL").is_err());
    }

    #[test]
    fn test_symbol_address_mapping() {
        let token = TokenSymbol::new("$ABC").unwrap();
        let addr = token.to_address();
        assert_eq!(TokenSymbol::from_address(&addr), Some(token));
        assert!(TokenSymbol::from_address(&Address::new([1u8; 20])).is_none());
    }
}

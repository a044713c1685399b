//! Key layout.
//!
//! Every key starts with one byte naming its record category.

use std::fmt;

use ldvm_primitives::{Address, DataId, Hash256, ModelId};

/// Record category, stored as the first byte of every key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum Prefix {
    /// Block body by block id
    Block = b'b',
    /// Block id by big-endian height
    Height = b'h',
    /// Account by address
    Account = b'a',
    /// Stake and lending ledger by address
    Ledger = b'l',
    /// Model by id
    Model = b'm',
    /// Data record by id
    Data = b'd',
    /// Previous data version by id and big-endian version
    PrevData = b'p',
    /// Name-service index by ASCII name
    Name = b'n',
    /// Chain metadata
    Meta = b'z',
}

impl Prefix {
    pub const ALL: [Prefix; 9] = [
        Prefix::Block,
        Prefix::Height,
        Prefix::Account,
        Prefix::Ledger,
        Prefix::Model,
        Prefix::Data,
        Prefix::PrevData,
        Prefix::Name,
        Prefix::Meta,
    ];

    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Prefix::Block => "block",
            Prefix::Height => "height",
            Prefix::Account => "account",
            Prefix::Ledger => "ledger",
            Prefix::Model => "model",
            Prefix::Data => "data",
            Prefix::PrevData => "prev_data",
            Prefix::Name => "name",
            Prefix::Meta => "meta",
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.byte() == byte)
    }

    /// Full store key: the prefix byte followed by `key`.
    pub fn key(self, key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(key.len() + 1);
        out.push(self.byte());
        out.extend_from_slice(key);
        out
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Marker trait linking a record type to its prefix.
pub trait Record {
    const PREFIX: Prefix;
}

pub fn height_key(height: u64) -> Vec<u8> {
    height.to_be_bytes().to_vec()
}

pub fn block_key(id: &Hash256) -> Vec<u8> {
    id.to_vec()
}

pub fn account_key(address: &Address) -> Vec<u8> {
    address.to_vec()
}

pub fn model_key(id: &ModelId) -> Vec<u8> {
    id.to_vec()
}

pub fn data_key(id: &DataId) -> Vec<u8> {
    id.to_vec()
}

pub fn prev_data_key(id: &DataId, version: u64) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend_from_slice(&version.to_be_bytes());
    out
}

pub fn name_key(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Meta key of the last accepted block id.
pub const LAST_ACCEPTED_KEY: &[u8] = b"last_accepted";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_bytes_are_unique() {
        let mut bytes: Vec<u8> = Prefix::ALL.iter().map(|p| p.byte()).collect();
        bytes.sort_unstable();
        bytes.dedup();
        assert_eq!(bytes.len(), Prefix::ALL.len());
        for prefix in Prefix::ALL {
            assert_eq!(Prefix::from_byte(prefix.byte()), Some(prefix));
        }
    }

    #[test]
    fn test_full_key() {
        assert_eq!(Prefix::Name.key(b"ldc"), b"nldc".to_vec());
        assert_eq!(height_key(1), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        let key = prev_data_key(&DataId::new([1u8; 20]), 2);
        assert_eq!(key.len(), 28);
        assert_eq!(key[27], 2);
    }
}

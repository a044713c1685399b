//! Fixed-length identifiers: addresses, hashes, model and data ids.

use std::fmt;
use std::str::FromStr;

use crate::constants::{ADDRESS_SIZE, HASH_SIZE};
use crate::error::{PrimitiveError, PrimitiveResult};

/// Implements serde for a `[u8; N]` newtype: byte strings in binary
/// formats, `0x`-prefixed hex in human readable ones.
macro_rules! impl_bytes_serde {
    ($name:ident, $len:expr) => {
        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_string())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct BytesVisitor;

                impl<'de> serde::de::Visitor<'de> for BytesVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        write!(f, "{} bytes for {}", $len, stringify!($name))
                    }

                    fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                        $name::from_slice(v).map_err(E::custom)
                    }

                    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        v.parse::<$name>().map_err(E::custom)
                    }

                    fn visit_seq<A: serde::de::SeqAccess<'de>>(
                        self,
                        mut seq: A,
                    ) -> Result<Self::Value, A::Error> {
                        let mut bytes = [0u8; $len];
                        for (i, byte) in bytes.iter_mut().enumerate() {
                            *byte = seq
                                .next_element()?
                                .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                        }
                        if seq.next_element::<u8>()?.is_some() {
                            return Err(serde::de::Error::invalid_length($len + 1, &self));
                        }
                        Ok($name(bytes))
                    }
                }

                if deserializer.is_human_readable() {
                    deserializer.deserialize_str(BytesVisitor)
                } else {
                    deserializer.deserialize_bytes(BytesVisitor)
                }
            }
        }
    };
}

pub(crate) use impl_bytes_serde;

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length in bytes.
            pub const LENGTH: usize = $len;

            /// All-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            #[inline]
            #[must_use]
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            #[inline]
            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            #[inline]
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            #[inline]
            #[must_use]
            pub fn to_vec(&self) -> Vec<u8> {
                self.0.to_vec()
            }

            /// Builds the value from a slice of exactly `LENGTH` bytes.
            pub fn from_slice(value: &[u8]) -> PrimitiveResult<Self> {
                let bytes: [u8; $len] =
                    value.try_into().map_err(|_| PrimitiveError::InvalidLength {
                        kind: stringify!($name),
                        expected: $len,
                        actual: value.len(),
                    })?;
                Ok(Self(bytes))
            }

            /// Parses a hex string, with or without the `0x` prefix.
            pub fn parse(s: &str) -> PrimitiveResult<Self> {
                let trimmed = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(trimmed).map_err(|err| {
                    PrimitiveError::invalid_format(format!("{}: {err}", stringify!($name)))
                })?;
                Self::from_slice(&bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = PrimitiveError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self(value)
            }
        }

        impl_bytes_serde!($name, $len);
    };
}

fixed_bytes!(
    /// 20-byte account address.
    Address,
    ADDRESS_SIZE
);

fixed_bytes!(
    /// 32-byte hash: transaction ids, block ids and state roots.
    Hash256,
    HASH_SIZE
);

fixed_bytes!(
    /// 20-byte id of a model record.
    ModelId,
    ADDRESS_SIZE
);

fixed_bytes!(
    /// 20-byte id of a data record.
    DataId,
    ADDRESS_SIZE
);

impl Address {
    /// Key of the native token account, also the fee burn sink.
    pub const NATIVE_TOKEN: Self = Self::ZERO;
}

impl ModelId {
    /// Derives the id of a model created by the transaction `tx_id`.
    #[must_use]
    pub fn from_tx_id(tx_id: &Hash256) -> Self {
        let mut out = [0u8; ADDRESS_SIZE];
        out.copy_from_slice(&tx_id.0[..ADDRESS_SIZE]);
        Self(out)
    }
}

impl DataId {
    /// Derives the id of a data record created by the transaction `tx_id`.
    #[must_use]
    pub fn from_tx_id(tx_id: &Hash256) -> Self {
        let mut out = [0u8; ADDRESS_SIZE];
        out.copy_from_slice(&tx_id.0[HASH_SIZE - ADDRESS_SIZE..]);
        Self(out)
    }
}

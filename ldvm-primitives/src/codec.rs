//! Canonical CBOR encoding.
//!
//! Every persisted or hashed value goes through this module. Encoding is
//! deterministic as long as values only use ordered maps; decoding
//! re-encodes the result and rejects any input that is not byte-identical,
//! so two replicas always hash the same bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PrimitiveError, PrimitiveResult};
use crate::hash::sha3_256;
use crate::id::Hash256;

/// Encodes `value` as canonical CBOR.
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> PrimitiveResult<Vec<u8>> {
    serde_cbor::to_vec(&value).map_err(|err| PrimitiveError::Encode {
        message: err.to_string(),
    })
}

/// Decodes canonical CBOR, rejecting non-canonical input.
pub fn from_canonical_slice<T: Serialize + DeserializeOwned>(data: &[u8]) -> PrimitiveResult<T> {
    let value: T = serde_cbor::from_slice(data).map_err(|err| PrimitiveError::decode(err.to_string()))?;
    let reencoded = to_canonical_vec(&value)?;
    if reencoded != data {
        return Err(PrimitiveError::decode(format!(
            "non-canonical encoding, {} bytes in, {} bytes re-encoded",
            data.len(),
            reencoded.len()
        )));
    }
    Ok(value)
}

/// Content hash of the canonical encoding of `value`.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> PrimitiveResult<Hash256> {
    Ok(sha3_256(&to_canonical_vec(value)?))
}

//! Hash functions used for ids, state roots and address derivation.

use sha3::{Digest, Keccak256, Sha3_256};

use crate::id::{Address, Hash256};

/// SHA3-256 of the input, the id function for transactions, blocks and
/// state snapshots.
#[must_use]
pub fn sha3_256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    Hash256::new(hasher.finalize().into())
}

/// Keccak-256 of the input (Ethereum compatible).
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derives an address from an uncompressed secp256k1 public key
/// (65 bytes, leading 0x04).
#[must_use]
pub fn address_from_uncompressed(public_key: &[u8]) -> Address {
    let body = public_key.strip_prefix(&[0x04]).unwrap_or(public_key);
    let digest = keccak256(body);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha3_256_known_vector() {
        // SHA3-256("")
        assert_eq!(
            sha3_256(b"").to_string(),
            "0xa7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_keccak256_known_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}

//! Signer keys, signatures and the signature recovery capability.
//!
//! Two schemes are supported:
//!
//! - secp256k1: 65-byte recoverable signatures (`r || s || v`); the signer
//!   key is the 20-byte Keccak address of the public key.
//! - Ed25519: 96-byte signatures (`signature || public key`); the signer key
//!   is the 32-byte public key.
//!
//! Both sign the SHA3-256 digest of the unsigned message.

use std::collections::HashSet;
use std::fmt;

use ed25519_dalek::Signer as _;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::constants::{ADDRESS_SIZE, MAX_KEEPERS};
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::hash::{address_from_uncompressed, sha3_256};
use crate::id::Address;

const SECP256K1_SIGNATURE_SIZE: usize = 65;
const ED25519_SIGNATURE_SIZE: usize = 96;
const ED25519_KEY_SIZE: usize = 32;

/// Scheme of a signer key, derived from its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Secp256k1,
    Ed25519,
    Unknown,
}

/// Key of an authorised signer: an address for secp256k1, a public key
/// for Ed25519.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(#[serde(with = "serde_bytes")] Vec<u8>);

impl Key {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn kind(&self) -> KeyKind {
        match self.0.len() {
            ADDRESS_SIZE => KeyKind::Secp256k1,
            ED25519_KEY_SIZE => KeyKind::Ed25519,
            _ => KeyKind::Unknown,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty() || self.0.iter().all(|b| *b == 0)
    }

    pub fn validate(&self) -> PrimitiveResult<()> {
        if self.is_empty() {
            return Err(PrimitiveError::invalid_keys("empty key"));
        }
        if self.kind() == KeyKind::Unknown {
            return Err(PrimitiveError::invalid_keys(format!(
                "unknown key length {}",
                self.0.len()
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Address controlled by this key. Ed25519 keys map to the low 20 bytes
    /// of the SHA3-256 of the public key.
    #[must_use]
    pub fn address(&self) -> Address {
        match self.kind() {
            KeyKind::Secp256k1 => Address::from_slice(&self.0).unwrap_or_default(),
            _ => {
                let digest = sha3_256(&self.0);
                let mut out = [0u8; ADDRESS_SIZE];
                out.copy_from_slice(&digest.0[32 - ADDRESS_SIZE..]);
                Address::new(out)
            }
        }
    }
}

impl From<Address> for Key {
    fn from(address: Address) -> Self {
        Self(address.to_vec())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(0x{})", hex::encode(&self.0))
    }
}

/// Ordered set of signer keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keys(Vec<Key>);

impl Keys {
    #[must_use]
    pub fn new(keys: Vec<Key>) -> Self {
        Self(keys)
    }

    /// Checks the set is bounded, free of duplicates and of empty keys.
    pub fn validate(&self) -> PrimitiveResult<()> {
        if self.0.len() > MAX_KEEPERS {
            return Err(PrimitiveError::invalid_keys(format!(
                "too many keys, expected <= {MAX_KEEPERS}, got {}",
                self.0.len()
            )));
        }
        let mut seen = HashSet::with_capacity(self.0.len());
        for key in &self.0 {
            key.validate()?;
            if !seen.insert(key) {
                return Err(PrimitiveError::invalid_keys(format!("duplicate key {key}")));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn has(&self, key: &Key) -> bool {
        self.0.contains(key)
    }

    /// True when some key controls `address`.
    #[must_use]
    pub fn has_address(&self, address: &Address) -> bool {
        self.0.iter().any(|key| key.address() == *address)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.0.iter()
    }

    /// Number of distinct keys in `signers` that belong to this set.
    #[must_use]
    pub fn count_signed(&self, signers: &Keys) -> usize {
        let mut counted: HashSet<&Key> = HashSet::new();
        for key in signers.iter() {
            if self.has(key) {
                counted.insert(key);
            }
        }
        counted.len()
    }
}

impl From<Vec<Key>> for Keys {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys)
    }
}

impl FromIterator<Key> for Keys {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Keys {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Raw signature bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(#[serde(with = "serde_bytes")] Vec<u8>);

impl Signature {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{})", hex::encode(&self.0))
    }
}

/// Signature verification capability consumed by the transaction pipeline.
pub trait SignerRecovery: Send + Sync {
    /// Recovers the distinct signer keys of `signatures` over `message`.
    fn derive_signers(&self, message: &[u8], signatures: &[Signature]) -> PrimitiveResult<Keys>;
}

/// secp256k1 + Ed25519 recovery.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRecovery;

impl DefaultRecovery {
    fn recover_secp256k1(digest: &[u8], sig: &[u8]) -> PrimitiveResult<Key> {
        let signature = EcdsaSignature::from_slice(&sig[..64])
            .map_err(|err| PrimitiveError::invalid_signature(err.to_string()))?;
        let v = if sig[64] >= 27 { sig[64] - 27 } else { sig[64] };
        let recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| PrimitiveError::invalid_signature(format!("invalid recovery id {v}")))?;
        let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|err| PrimitiveError::invalid_signature(err.to_string()))?;
        let point = verifying_key.to_encoded_point(false);
        Ok(Key::from(address_from_uncompressed(point.as_bytes())))
    }

    fn recover_ed25519(digest: &[u8], sig: &[u8]) -> PrimitiveResult<Key> {
        let signature = ed25519_dalek::Signature::from_slice(&sig[..64])
            .map_err(|err| PrimitiveError::invalid_signature(err.to_string()))?;
        let mut public = [0u8; ED25519_KEY_SIZE];
        public.copy_from_slice(&sig[64..]);
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&public)
            .map_err(|err| PrimitiveError::invalid_signature(err.to_string()))?;
        verifying_key
            .verify_strict(digest, &signature)
            .map_err(|err| PrimitiveError::invalid_signature(err.to_string()))?;
        Ok(Key::new(public.to_vec()))
    }
}

impl SignerRecovery for DefaultRecovery {
    fn derive_signers(&self, message: &[u8], signatures: &[Signature]) -> PrimitiveResult<Keys> {
        let digest = sha3_256(message);
        let mut keys = Vec::with_capacity(signatures.len());
        for sig in signatures {
            let key = match sig.len() {
                SECP256K1_SIGNATURE_SIZE => Self::recover_secp256k1(digest.as_bytes(), sig.as_bytes())?,
                ED25519_SIGNATURE_SIZE => Self::recover_ed25519(digest.as_bytes(), sig.as_bytes())?,
                other => {
                    return Err(PrimitiveError::invalid_signature(format!(
                        "unknown signature length {other}"
                    )))
                }
            };
            if keys.contains(&key) {
                return Err(PrimitiveError::invalid_signature(format!(
                    "duplicate signer {key}"
                )));
            }
            keys.push(key);
        }
        Ok(Keys::new(keys))
    }
}

/// Local signing key, used by wallets, tools and tests.
#[derive(Clone)]
pub enum LocalSigner {
    Secp256k1(SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

impl LocalSigner {
    #[must_use]
    pub fn random_secp256k1() -> Self {
        Self::Secp256k1(SigningKey::random(&mut OsRng))
    }

    #[must_use]
    pub fn random_ed25519() -> Self {
        Self::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
    }

    pub fn secp256k1_from_bytes(secret: &[u8; 32]) -> PrimitiveResult<Self> {
        SigningKey::from_slice(secret)
            .map(Self::Secp256k1)
            .map_err(|err| PrimitiveError::invalid_keys(err.to_string()))
    }

    #[must_use]
    pub fn ed25519_from_bytes(secret: &[u8; 32]) -> Self {
        Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(secret))
    }

    /// Signer key as seen by [`SignerRecovery`].
    #[must_use]
    pub fn key(&self) -> Key {
        match self {
            Self::Secp256k1(sk) => {
                let point = sk.verifying_key().to_encoded_point(false);
                Key::from(address_from_uncompressed(point.as_bytes()))
            }
            Self::Ed25519(sk) => Key::new(sk.verifying_key().to_bytes().to_vec()),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.key().address()
    }

    /// Signs the SHA3-256 digest of `message`.
    pub fn sign(&self, message: &[u8]) -> PrimitiveResult<Signature> {
        let digest = sha3_256(message);
        match self {
            Self::Secp256k1(sk) => {
                let (signature, recovery_id) = sk
                    .sign_prehash_recoverable(digest.as_bytes())
                    .map_err(|err| PrimitiveError::invalid_signature(err.to_string()))?;
                let mut out = Vec::with_capacity(SECP256K1_SIGNATURE_SIZE);
                out.extend_from_slice(&signature.to_bytes());
                out.push(recovery_id.to_byte());
                Ok(Signature::new(out))
            }
            Self::Ed25519(sk) => {
                let signature = sk.sign(digest.as_bytes());
                let mut out = Vec::with_capacity(ED25519_SIGNATURE_SIZE);
                out.extend_from_slice(&signature.to_bytes());
                out.extend_from_slice(&sk.verifying_key().to_bytes());
                Ok(Signature::new(out))
            }
        }
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalSigner({})", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secp256k1_sign_and_recover() {
        let signer = LocalSigner::secp256k1_from_bytes(&[7u8; 32]).unwrap();
        let sig = signer.sign(b"hello").unwrap();
        assert_eq!(sig.len(), 65);

        let keys = DefaultRecovery.derive_signers(b"hello", &[sig.clone()]).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.has(&signer.key()));
        assert_eq!(signer.key().kind(), KeyKind::Secp256k1);

        // different message recovers a different key
        let other = DefaultRecovery.derive_signers(b"hellO", &[sig]).unwrap();
        assert!(!other.has(&signer.key()));
    }

    #[test]
    fn test_ed25519_sign_and_recover() {
        let signer = LocalSigner::ed25519_from_bytes(&[9u8; 32]);
        let sig = signer.sign(b"msg").unwrap();
        assert_eq!(sig.len(), 96);
        let keys = DefaultRecovery.derive_signers(b"msg", &[sig.clone()]).unwrap();
        assert!(keys.has(&signer.key()));
        assert_eq!(signer.key().kind(), KeyKind::Ed25519);

        assert!(DefaultRecovery.derive_signers(b"other", &[sig]).is_err());
    }

    #[test]
    fn test_duplicate_and_malformed_signatures() {
        let signer = LocalSigner::secp256k1_from_bytes(&[3u8; 32]).unwrap();
        let sig = signer.sign(b"m").unwrap();
        assert!(DefaultRecovery
            .derive_signers(b"m", &[sig.clone(), sig])
            .is_err());
        assert!(DefaultRecovery
            .derive_signers(b"m", &[Signature::new(vec![1, 2, 3])])
            .is_err());
    }

    #[test]
    fn test_keys_validate() {
        let a = Key::from(Address::new([1u8; 20]));
        let b = Key::from(Address::new([2u8; 20]));
        assert!(Keys::new(vec![a.clone(), b.clone()]).validate().is_ok());
        assert!(Keys::new(vec![a.clone(), a.clone()]).validate().is_err());
        assert!(Keys::new(vec![Key::from(Address::ZERO)]).validate().is_err());
        assert!(Keys::new(vec![Key::new(vec![1, 2, 3])]).validate().is_err());

        let too_many: Keys = (0..=MAX_KEEPERS as u32)
            .map(|i| {
                let mut bytes = [0u8; 20];
                bytes[..4].copy_from_slice(&(i + 1).to_be_bytes());
                Key::from(Address::new(bytes))
            })
            .collect();
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_count_signed_is_distinct() {
        let a = Key::from(Address::new([1u8; 20]));
        let b = Key::from(Address::new([2u8; 20]));
        let c = Key::from(Address::new([3u8; 20]));
        let keepers = Keys::new(vec![a.clone(), b.clone()]);
        let signers = Keys::new(vec![a.clone(), a, c]);
        assert_eq!(keepers.count_signed(&signers), 1);
    }
}

//! Property-based tests for ldvm-primitives
//!
//! These tests use proptest to verify:
//! - Id parsing round-trips through Display
//! - Symbol validity is preserved through address mapping
//! - Signatures recover the signing key for any message

use ldvm_primitives::{
    from_canonical_slice, sha3_256, to_canonical_vec, Address, DefaultRecovery, Hash256,
    LocalSigner, SignerRecovery, TokenSymbol,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_address_display_parse(bytes in any::<[u8; 20]>()) {
        let addr = Address::new(bytes);
        let parsed: Address = addr.to_string().parse().unwrap();
        prop_assert_eq!(parsed, addr);
    }

    #[test]
    fn test_hash_canonical_round_trip(bytes in any::<[u8; 32]>()) {
        let hash = Hash256::new(bytes);
        let encoded = to_canonical_vec(&hash).unwrap();
        let decoded: Hash256 = from_canonical_slice(&encoded).unwrap();
        prop_assert_eq!(decoded, hash);
    }

    #[test]
    fn test_sha3_consistency(data in any::<Vec<u8>>()) {
        prop_assert_eq!(sha3_256(&data), sha3_256(&data));
    }

    #[test]
    fn test_token_symbol_through_address(name in "[A-Z][A-Z0-9]{1,9}") {
        let symbol = TokenSymbol::new(&format!("${name}")).unwrap();
        prop_assert!(symbol.is_valid());
        prop_assert_eq!(TokenSymbol::from_address(&symbol.to_address()), Some(symbol));
        prop_assert_eq!(symbol.to_string(), format!("${name}"));
    }

    #[test]
    fn test_lowercase_symbols_rejected(name in "[a-z]{2,10}") {
        let symbol = format!("${name}");
        prop_assert!(TokenSymbol::new(&symbol).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_secp256k1_recovers_signer(message in any::<Vec<u8>>()) {
        let signer = LocalSigner::random_secp256k1();
        let sig = signer.sign(&message).unwrap();
        let keys = DefaultRecovery.derive_signers(&message, &[sig]).unwrap();
        prop_assert!(keys.has(&signer.key()));
    }

    #[test]
    fn test_ed25519_recovers_signer(message in any::<Vec<u8>>()) {
        let signer = LocalSigner::random_ed25519();
        let sig = signer.sign(&message).unwrap();
        let keys = DefaultRecovery.derive_signers(&message, &[sig]).unwrap();
        prop_assert!(keys.has(&signer.key()));
    }
}

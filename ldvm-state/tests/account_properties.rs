//! Property tests for account balances and encoding.

use ldvm_primitives::{Address, BigUint, TokenSymbol};
use ldvm_state::Account;
use num_traits::ToPrimitive;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(u64),
    Sub(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..1_000_000).prop_map(Op::Add),
        (0u64..2_000_000).prop_map(Op::Sub),
    ]
}

proptest! {
    #[test]
    fn balance_tracks_successful_ops(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let token = TokenSymbol::new("$ABC").unwrap();
        let mut account = Account::new(Address::new([1u8; 20]));
        let mut expected: u128 = 0;
        for op in ops {
            match op {
                Op::Add(amount) => {
                    account.add(&token, &BigUint::from(amount)).unwrap();
                    expected += u128::from(amount);
                }
                Op::Sub(amount) => {
                    let result = account.sub(&token, &BigUint::from(amount));
                    if u128::from(amount) <= expected {
                        prop_assert!(result.is_ok());
                        expected -= u128::from(amount);
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
            }
            prop_assert_eq!(account.balance_of(&token).to_u128(), Some(expected));
        }
        // zero balances are not kept
        prop_assert_eq!(account.tokens.contains_key(&token), expected > 0);
    }

    #[test]
    fn account_bytes_round_trip(
        nonce in any::<u64>(),
        balance in any::<u64>(),
        groups in prop::collection::btree_map(1u64..u64::MAX, prop::collection::btree_set(any::<u64>(), 1..8), 0..4),
    ) {
        let mut account = Account::new(Address::new([5u8; 20]));
        account.nonce = nonce;
        account.balance = BigUint::from(balance);
        for (expire, nonces) in groups {
            account.nonce_table.insert(expire, nonces.into_iter().collect());
        }
        let bytes = account.to_bytes().unwrap();
        let decoded = Account::from_bytes(&account.address, &bytes).unwrap();
        prop_assert_eq!(&decoded, &account);
        prop_assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn consumed_nonce_cannot_replay(nonces in prop::collection::btree_set(any::<u64>(), 1..16)) {
        let mut account = Account::new(Address::new([6u8; 20]));
        account.balance = BigUint::from(1_000u64);
        let nonces: Vec<u64> = nonces.into_iter().collect();
        account.add_nonce_table(100, &nonces).unwrap();
        let zero = BigUint::from(0u64);
        for nonce in &nonces {
            account.sub_by_nonce_table(&TokenSymbol::NATIVE, 100, *nonce, &zero).unwrap();
            prop_assert!(account.sub_by_nonce_table(&TokenSymbol::NATIVE, 100, *nonce, &zero).is_err());
        }
        prop_assert!(account.nonce_table.is_empty());
    }
}

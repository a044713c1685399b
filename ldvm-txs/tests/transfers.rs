mod common;

use common::*;
use ldvm_primitives::{Address, BigUint, ErrorClass, Keys, LocalSigner, TokenSymbol, TxType, LDC};
use ldvm_txs::payload::{NonceTableUpdate, TransferItem, TxAccounter, TxTransfer};
use ldvm_txs::{encode_payload, BlockContext, TxError, TxHandler};

fn transfer(from: &LocalSigner, to: Address, nonce: u64, amount: BigUint) -> ldvm_txs::Transaction {
    let mut tx = tx_data(TxType::Transfer, from.address(), nonce);
    tx.to = Some(to);
    tx.amount = Some(amount);
    sign(tx, &[from])
}

#[test]
fn transfer_charges_fee_and_tip() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    let bob = LocalSigner::random_ed25519().address();
    ctx.fund(&alice.address(), 10 * LDC);

    let tx = ctx.execute(transfer(&alice, bob, 0, ldc(1))).unwrap();
    let gas = BigUint::from(tx.gas());
    let tip = &gas * 100u64;
    let fee = &gas * GAS_PRICE;

    assert_eq!(tx.gas(), TxType::Transfer.base_gas() + tx.size());
    assert_eq!(ctx.balance(&bob), ldc(1));
    assert_eq!(ctx.balance(&ctx.miner), tip);
    assert_eq!(ctx.balance(&Address::NATIVE_TOKEN), fee);
    assert_eq!(
        ctx.balance(&alice.address()),
        ldc(10) - ldc(1) - &tip - &fee
    );
    assert_eq!(ctx.account(&alice.address()).nonce, 1);
}

#[test]
fn tip_is_capped_by_fee_cap() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    ctx.fund(&alice.address(), 10 * LDC);

    let mut tx = tx_data(TxType::Transfer, alice.address(), 0);
    tx.to = Some(LocalSigner::random_secp256k1().address());
    tx.amount = Some(ldc(1));
    tx.gas_tip = 1_000_000;
    tx.gas_fee_cap = GAS_PRICE + 7;
    let tx = ctx.execute(sign(tx, &[&alice])).unwrap();

    assert_eq!(ctx.balance(&ctx.miner), BigUint::from(tx.gas() * 7));
}

#[test]
fn fee_cap_below_gas_price_is_rejected() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    ctx.fund(&alice.address(), 10 * LDC);

    let mut tx = tx_data(TxType::Transfer, alice.address(), 0);
    tx.to = Some(LocalSigner::random_secp256k1().address());
    tx.amount = Some(ldc(1));
    tx.gas_fee_cap = GAS_PRICE - 1;
    let err = ctx.execute(sign(tx, &[&alice])).unwrap_err();
    assert_eq!(err.class(), ErrorClass::SemanticRejection);
}

#[test]
fn replayed_nonce_is_a_replay_violation() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    let bob = LocalSigner::random_secp256k1().address();
    ctx.fund(&alice.address(), 10 * LDC);

    let raw = transfer(&alice, bob, 0, ldc(1));
    ctx.execute(raw.clone()).unwrap();
    let err = ctx.execute(raw).unwrap_err();
    assert_eq!(err.class(), ErrorClass::ReplayViolation);
    assert!(err.is_permanent());
    assert_eq!(ctx.balance(&bob), ldc(1));
}

#[test]
fn wrong_chain_is_malformed() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    ctx.fund(&alice.address(), 10 * LDC);

    let mut tx = tx_data(TxType::Transfer, alice.address(), 0);
    tx.chain_id = CHAIN_ID + 1;
    tx.to = Some(LocalSigner::random_secp256k1().address());
    tx.amount = Some(ldc(1));
    let err = ctx.execute(sign(tx, &[&alice])).unwrap_err();
    assert_eq!(err.class(), ErrorClass::MalformedInput);
}

#[test]
fn insufficient_balance_keeps_the_pledge() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    ctx.fund(&alice.address(), LDC);

    // the whole balance leaves nothing for fees and the pledge
    let err = ctx
        .execute(transfer(&alice, Address::new([7; 20]), 0, ldc(1)))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::SemanticRejection);
    assert_eq!(ctx.balance(&alice.address()), ldc(1));
}

#[test]
fn unsigned_by_owner_is_rejected() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    let mallory = LocalSigner::random_secp256k1();
    ctx.fund(&alice.address(), 10 * LDC);

    let mut tx = tx_data(TxType::Transfer, alice.address(), 0);
    tx.to = Some(mallory.address());
    tx.amount = Some(ldc(1));
    let err = ctx.execute(sign(tx, &[&mallory])).unwrap_err();
    assert!(matches!(err, TxError::Rejected { .. }), "{err}");
}

#[test]
fn unknown_type_fails_decoding() {
    let alice = LocalSigner::random_secp256k1();
    let mut tx = tx_data(TxType::Transfer, alice.address(), 0);
    tx.tx_type = 999;
    let err = decode(sign(tx, &[&alice])).unwrap_err();
    assert!(matches!(err, TxError::UnknownTxType(999)));
    assert_eq!(err.class(), ErrorClass::MalformedInput);
}

#[test]
fn shape_errors_are_caught_before_state() {
    let alice = LocalSigner::random_secp256k1();

    // transfer without amount
    let mut tx = tx_data(TxType::Transfer, alice.address(), 0);
    tx.to = Some(Address::new([9; 20]));
    assert!(matches!(
        decode(sign(tx, &[&alice])),
        Err(TxError::Malformed { .. })
    ));

    // sending to itself
    let mut tx = tx_data(TxType::Transfer, alice.address(), 0);
    tx.to = Some(alice.address());
    tx.amount = Some(ldc(1));
    assert!(matches!(
        decode(sign(tx, &[&alice])),
        Err(TxError::Malformed { .. })
    ));

    // no signature at all
    let mut tx = tx_data(TxType::Transfer, alice.address(), 0);
    tx.to = Some(Address::new([9; 20]));
    tx.amount = Some(ldc(1));
    assert!(decode(sign(tx, &[])).is_err());
}

#[test]
fn transfer_multiple_pays_every_recipient() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    ctx.fund(&alice.address(), 10 * LDC);
    let bob = Address::new([1; 20]);
    let carol = Address::new([2; 20]);

    let items = vec![
        TransferItem { to: bob, amount: ldc(1) },
        TransferItem { to: carol, amount: ldc(2) },
    ];
    let mut tx = tx_data(TxType::TransferMultiple, alice.address(), 0);
    tx.data = encode_payload(&items).unwrap();
    let tx = ctx.execute(sign(tx, &[&alice])).unwrap();

    let cost = BigUint::from(tx.gas() * (GAS_PRICE + 100));
    assert_eq!(ctx.balance(&bob), ldc(1));
    assert_eq!(ctx.balance(&carol), ldc(2));
    assert_eq!(ctx.balance(&alice.address()), ldc(7) - cost);
}

#[test]
fn cashed_check_consumes_issuer_nonce() {
    let ctx = MockContext::new();
    let issuer = LocalSigner::random_secp256k1();
    let payee = LocalSigner::random_secp256k1();
    ctx.fund(&issuer.address(), 10 * LDC);
    ctx.fund(&payee.address(), LDC);
    let expire = TIMESTAMP + 3600;

    let mut tx = tx_data(TxType::AddNonceTable, issuer.address(), 0);
    tx.data = encode_payload(&NonceTableUpdate {
        expire,
        nonces: vec![1, 2],
    })
    .unwrap();
    ctx.execute(sign(tx, &[&issuer])).unwrap();
    assert_eq!(ctx.account(&issuer.address()).nonce_table[&expire], vec![1, 2]);

    let cash = |nonce: u64, check_nonce: u64| {
        let check = TxTransfer {
            nonce: check_nonce,
            from: Some(issuer.address()),
            to: Some(payee.address()),
            token: None,
            amount: ldc(2),
            expire,
            memo: Some("rent".into()),
        };
        let mut tx = tx_data(TxType::TransferCash, payee.address(), nonce);
        tx.to = Some(issuer.address());
        tx.amount = Some(ldc(2));
        tx.data = encode_payload(&check).unwrap();
        sign_with_ex(tx, &[&payee], &[&issuer])
    };

    let issuer_before = ctx.balance(&issuer.address());
    let tx = ctx.execute(cash(0, 1)).unwrap();
    let cost = BigUint::from(tx.gas() * (GAS_PRICE + 100));
    assert_eq!(ctx.balance(&issuer.address()), issuer_before - ldc(2));
    assert_eq!(ctx.balance(&payee.address()), ldc(3) - cost);
    assert_eq!(ctx.account(&issuer.address()).nonce_table[&expire], vec![2]);

    // the same check cannot be cashed twice
    let err = ctx.execute(cash(1, 1)).unwrap_err();
    assert_eq!(err.class(), ErrorClass::ReplayViolation);

    // the last nonce empties the group
    ctx.execute(cash(1, 2)).unwrap();
    assert!(ctx.account(&issuer.address()).nonce_table.is_empty());
}

#[test]
fn token_accounts_send_only_allowed_kinds() {
    let ctx = MockContext::new();
    let creator = LocalSigner::random_secp256k1();
    let keeper = LocalSigner::random_ed25519();
    let symbol = TokenSymbol::new("$TEST").unwrap();
    let token = symbol.to_address();
    let pledge = ctx.fee_config().min_token_pledge;
    ctx.fund(&creator.address(), pledge + 10 * LDC);

    let info = TxAccounter {
        threshold: Some(1),
        keepers: Some(Keys::new(vec![keeper.key()])),
        amount: Some(BigUint::from(1_000_000u64)),
        ..TxAccounter::default()
    };
    let mut tx = tx_data(TxType::CreateToken, creator.address(), 0);
    tx.to = Some(token);
    tx.amount = Some(BigUint::from(pledge));
    tx.data = encode_payload(&info).unwrap();
    ctx.execute(sign(tx, &[&creator])).unwrap();

    let account = ctx.account(&token);
    assert_eq!(account.balance_of(&symbol), BigUint::from(1_000_000u64));
    assert_eq!(account.balance, BigUint::from(pledge));

    // fees come on top of the pledge
    ctx.fund(&token, LDC);
    let bob = LocalSigner::random_secp256k1().address();
    let mut tx = tx_data(TxType::Transfer, token, 0);
    tx.to = Some(bob);
    tx.token = Some(symbol);
    tx.amount = Some(BigUint::from(100u64));
    ctx.execute(sign(tx, &[&keeper])).unwrap();
    assert_eq!(ctx.account(&bob).balance_of(&symbol), BigUint::from(100u64));

    let mut tx = tx_data(TxType::TransferMultiple, token, 1);
    tx.token = Some(symbol);
    tx.data = encode_payload(&vec![TransferItem {
        to: bob,
        amount: BigUint::from(1u64),
    }])
    .unwrap();
    let err = ctx.execute(sign(tx, &[&keeper])).unwrap_err();
    assert!(matches!(err, TxError::Rejected { .. }), "{err}");
}

#[test]
fn verify_does_not_change_state() {
    let ctx = MockContext::new();
    let alice = LocalSigner::random_secp256k1();
    ctx.fund(&alice.address(), 10 * LDC);

    let tx = decode(transfer(&alice, Address::new([3; 20]), 0, ldc(1))).unwrap();
    tx.verify(&ctx).unwrap();
    tx.verify(&ctx).unwrap();
    assert_eq!(ctx.balance(&alice.address()), ldc(10));
    assert_eq!(ctx.account(&alice.address()).nonce, 0);
}

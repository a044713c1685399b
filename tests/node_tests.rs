use std::sync::Arc;

use ldvm::chain::ConsensusBlock;
use ldvm::logging::{self, LogConfig};
use ldvm::primitives::{Address, BigUint, DefaultRecovery, LocalSigner, TxType, LDC};
use ldvm::store::{MemoryStore, Store};
use ldvm::txs::{Transaction, TxData, TxEntry, TxOrBatch};
use ldvm::{open_chain, NodeConfig};

fn node_config(funded: &LocalSigner) -> NodeConfig {
    NodeConfig::from_toml_str(&format!(
        r#"
        [chain]
        network = "local"

        [genesis]
        timestamp = 1700000000
        alloc = [{{ address = "{}", balance = {} }}]
        "#,
        funded.address(),
        100 * LDC
    ))
    .unwrap()
}

#[test]
fn configured_chain_builds_and_reopens() {
    let alice = LocalSigner::random_ed25519();
    let config = node_config(&alice);
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let miner = Address::new([9; 20]);

    let chain = open_chain(&config, Arc::clone(&store), miner).unwrap();
    let genesis_state = chain.last_accepted().state().unwrap();
    assert_eq!(
        genesis_state.account(&alice.address()).unwrap().balance,
        BigUint::from(100 * LDC)
    );

    let mut raw = Transaction::new(TxData {
        tx_type: u16::from(TxType::Transfer),
        chain_id: config.chain.effective_chain_id(),
        nonce: 0,
        gas_tip: 10,
        gas_fee_cap: 100_000,
        from: alice.address(),
        to: Some(Address::new([5; 20])),
        amount: Some(BigUint::from(LDC)),
        ..TxData::default()
    });
    raw.sign(&alice).unwrap();
    let tx = TxOrBatch::decode(TxEntry::Tx(raw), &DefaultRecovery).unwrap();
    chain.pool().add_remote(vec![tx]).unwrap();

    let block = chain.build_block(1_700_000_005).unwrap();
    block.accept().unwrap();
    drop(chain);

    let reopened = open_chain(&config, store, miner).unwrap();
    assert_eq!(reopened.last_accepted().id(), block.id());
    assert!(reopened.pool().is_empty());
}

#[test]
fn invalid_config_does_not_open() {
    let mut config = NodeConfig::default();
    config.chain.fee_configs.clear();
    assert!(open_chain(&config, Arc::new(MemoryStore::new()), Address::ZERO).is_err());
}

#[test]
fn logging_initializes_once() {
    logging::init(&LogConfig::default()).unwrap();
    assert!(logging::init(&LogConfig::default()).is_err());
}

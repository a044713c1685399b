use std::time::Duration;

use ldvm_primitives::{Address, Hash256};
use ldvm_txpool::{KnownStatus, PoolError, PoolItem, TxPool, TxPoolConfig};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Item {
    id: u8,
    sender: u8,
    nonce: u64,
    size: u64,
    priority: u64,
}

impl Item {
    fn new(id: u8, sender: u8, nonce: u64, size: u64, priority: u64) -> Self {
        Self {
            id,
            sender,
            nonce,
            size,
            priority,
        }
    }
}

impl PoolItem for Item {
    fn id(&self) -> Hash256 {
        Hash256::new([self.id; 32])
    }

    fn sender(&self) -> Address {
        Address::new([self.sender; 20])
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn priority(&self) -> u64 {
        self.priority
    }
}

fn pool() -> TxPool<Item> {
    TxPool::new(TxPoolConfig::default())
}

fn ids(items: &[Item]) -> Vec<u8> {
    items.iter().map(|item| item.id).collect()
}

#[test]
fn pop_fills_the_budget_in_priority_order() {
    let pool = pool();
    pool.add_remote(vec![
        Item::new(1, 1, 0, 193, 400),
        Item::new(2, 2, 0, 1198, 300),
        Item::new(3, 3, 0, 2198, 200),
        Item::new(4, 4, 0, 3198, 100),
    ])
    .unwrap();

    let popped = pool.pop_txs_by_size(5500);
    assert_eq!(ids(&popped), vec![1, 2, 3]);
    assert_eq!(popped.iter().map(|item| item.size).sum::<u64>(), 3589);
    assert_eq!(pool.len(), 1);
    assert!(pool.get(&Item::new(4, 4, 0, 0, 0).id()).is_some());
}

#[test]
fn pop_skips_what_does_not_fit() {
    let pool = pool();
    pool.add_remote(vec![
        Item::new(1, 1, 0, 193, 300),
        Item::new(2, 2, 0, 1198, 200),
        Item::new(3, 3, 0, 2198, 100),
        Item::new(4, 4, 0, 3198, 400),
    ])
    .unwrap();

    // 3198 + 193 + 1198 leaves no room for 2198
    let popped = pool.pop_txs_by_size(5500);
    assert_eq!(ids(&popped), vec![4, 1, 2]);
    assert_eq!(pool.len(), 1);
    assert_eq!(ids(&pool.pop_txs_by_size(5500)), vec![3]);
    assert!(pool.is_empty());
}

#[test]
fn pop_keeps_sender_nonce_order() {
    let pool = pool();
    pool.add_remote(vec![
        Item::new(3, 1, 2, 100, 900),
        Item::new(1, 1, 0, 100, 10),
        Item::new(2, 1, 1, 100, 500),
        Item::new(9, 2, 0, 100, 50),
    ])
    .unwrap();

    let popped = pool.pop_txs_by_size(10_000);
    let sender_one: Vec<u64> = popped
        .iter()
        .filter(|item| item.sender == 1)
        .map(|item| item.nonce)
        .collect();
    assert_eq!(sender_one, vec![0, 1, 2]);
    assert_eq!(popped.len(), 4);
}

#[test]
fn sender_that_does_not_fit_contributes_nothing_more() {
    let pool = pool();
    pool.add_remote(vec![
        Item::new(1, 1, 0, 600, 100),
        Item::new(2, 1, 1, 10, 100),
        Item::new(3, 2, 0, 300, 10),
    ])
    .unwrap();

    let popped = pool.pop_txs_by_size(500);
    assert_eq!(ids(&popped), vec![3]);
    assert_eq!(pool.len(), 2);
}

#[test]
fn many_small_items_do_not_crowd_out_other_senders() {
    let pool = pool();
    let mut items: Vec<Item> = (0..5)
        .map(|n| Item::new(n + 1, 1, u64::from(n), 100, 100))
        .collect();
    items.push(Item::new(10, 2, 0, 100, 80));
    pool.add_remote(items).unwrap();

    let popped = pool.pop_txs_by_size(300);
    assert!(ids(&popped).contains(&10), "{popped:?}");
}

#[test]
fn add_remote_is_idempotent() {
    let pool = pool();
    let item = Item::new(1, 1, 0, 100, 1);
    assert_eq!(pool.add_remote(vec![item.clone(), item.clone()]).unwrap(), 1);
    assert_eq!(pool.add_remote(vec![item.clone()]).unwrap(), 0);
    assert_eq!(pool.len(), 1);

    // still pending after being popped
    pool.pop_txs_by_size(1000);
    assert_eq!(pool.add_remote(vec![item.clone()]).unwrap(), 0);
    assert_eq!(pool.known_status(&item.id()), Some(KnownStatus::Pending));
}

#[test]
fn add_local_skips_rejected() {
    let pool = pool();
    let good = Item::new(1, 1, 0, 100, 1);
    let bad = Item::new(2, 2, 0, 100, 1);
    pool.add_remote(vec![good.clone(), bad.clone()]).unwrap();
    let popped = pool.pop_txs_by_size(1000);
    assert_eq!(popped.len(), 2);

    pool.reject(&bad.id());
    assert_eq!(pool.add_local(popped), 1);
    assert_eq!(ids(&pool.pop_txs_by_size(1000)), vec![1]);
    assert_eq!(pool.known_status(&bad.id()), Some(KnownStatus::Rejected));
    assert_eq!(pool.add_remote(vec![bad]).unwrap(), 0);
}

#[test]
fn included_items_leave_the_queue() {
    let pool = pool();
    let item = Item::new(1, 1, 0, 100, 1);
    pool.add_remote(vec![item.clone()]).unwrap();
    pool.set_included(7, &[item.id()]);

    assert!(pool.is_empty());
    assert_eq!(pool.known_status(&item.id()), Some(KnownStatus::Included(7)));
    assert_eq!(pool.known_status(&item.id()).map(KnownStatus::code), Some(7));

    // a rejected block hands its transactions back
    assert_eq!(pool.add_local(vec![item.clone()]), 1);
    assert_eq!(pool.known_status(&item.id()).map(KnownStatus::code), Some(-1));
}

#[test]
fn full_pool_refuses_remote_items() {
    let pool: TxPool<Item> = TxPool::new(TxPoolConfig {
        max_entries: 2,
        ..TxPoolConfig::default()
    });
    let err = pool
        .add_remote(vec![
            Item::new(1, 1, 0, 1, 1),
            Item::new(2, 2, 0, 1, 1),
            Item::new(3, 3, 0, 1, 1),
        ])
        .unwrap_err();
    assert_eq!(err, PoolError::Full { capacity: 2 });
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.stats().queued_bytes, 2);
}

#[test]
fn known_ids_expire() {
    let pool: TxPool<Item> = TxPool::new(TxPoolConfig {
        known_ttl_secs: 0,
        ..TxPoolConfig::default()
    });
    let item = Item::new(1, 1, 0, 1, 1);
    pool.add_remote(vec![item.clone()]).unwrap();
    pool.reject(&item.id());
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(pool.known_status(&item.id()), None);
    assert_eq!(pool.add_remote(vec![item]).unwrap(), 1);
}

#[test]
fn expired_ids_are_forgotten_without_remote_traffic() {
    let pool: TxPool<Item> = TxPool::new(TxPoolConfig {
        known_ttl_secs: 0,
        ..TxPoolConfig::default()
    });
    pool.add_remote(vec![Item::new(1, 1, 0, 1, 1), Item::new(2, 2, 0, 1, 1)])
        .unwrap();
    assert_eq!(pool.stats().known, 2);

    std::thread::sleep(Duration::from_millis(5));
    pool.reject(&Hash256::new([1; 32]));
    assert_eq!(pool.stats().known, 1);

    std::thread::sleep(Duration::from_millis(5));
    pool.set_included(9, &[Hash256::new([2; 32])]);
    assert_eq!(pool.stats().known, 1);

    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(pool.add_local(vec![Item::new(3, 3, 0, 1, 1)]), 1);
    assert_eq!(pool.stats().known, 1);
}

#[tokio::test]
async fn remote_admission_signals_listeners() {
    let pool = pool();
    let mut gossip = pool.subscribe();
    let notify = pool.notifier();

    pool.add_remote(vec![Item::new(1, 1, 0, 1, 1)]).unwrap();
    tokio::time::timeout(Duration::from_secs(1), notify.notified())
        .await
        .unwrap();
    assert_eq!(gossip.recv().await.unwrap().id, 1);

    // local re-admission wakes the builder but is not gossiped
    let popped = pool.pop_txs_by_size(10);
    pool.add_local(popped);
    tokio::time::timeout(Duration::from_secs(1), notify.notified())
        .await
        .unwrap();
    assert!(gossip.try_recv().is_err());
}

proptest! {
    #[test]
    fn pop_respects_budget_and_nonce_order(
        specs in prop::collection::vec((0u8..4, 1u64..2000, 0u64..1000), 1..24),
        budget in 0u64..10_000,
    ) {
        let pool = pool();
        let mut next_nonce = [0u64; 4];
        let items: Vec<Item> = specs
            .iter()
            .enumerate()
            .map(|(i, (sender, size, priority))| {
                let nonce = next_nonce[*sender as usize];
                next_nonce[*sender as usize] += 1;
                Item::new(i as u8, *sender, nonce, *size, *priority)
            })
            .collect();
        pool.add_remote(items.clone()).unwrap();

        let popped = pool.pop_txs_by_size(budget);
        prop_assert!(popped.iter().map(|item| item.size).sum::<u64>() <= budget);
        prop_assert_eq!(popped.len() + pool.len(), items.len());
        for sender in 0u8..4 {
            let nonces: Vec<u64> = popped
                .iter()
                .filter(|item| item.sender == sender)
                .map(|item| item.nonce)
                .collect();
            let expected: Vec<u64> = (0..nonces.len() as u64).collect();
            prop_assert_eq!(nonces, expected);
        }
    }
}

//! Integration tests for versioned overlays over the memory store.

use std::sync::Arc;

use ldvm_store::{MemoryStore, Prefix, Record, Store, StoreExt, VersionDb};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Meta {
    height: u64,
    note: String,
}

impl Record for Meta {
    const PREFIX: Prefix = Prefix::Meta;
}

#[test]
fn test_typed_records() {
    let store = MemoryStore::new();
    let meta = Meta {
        height: 3,
        note: "x".into(),
    };
    store.put_record(b"m".to_vec(), &meta).unwrap();
    assert_eq!(store.get_record::<Meta>(b"m").unwrap(), Some(meta));
    assert_eq!(store.get_record::<Meta>(b"none").unwrap(), None);

    // non-canonical bytes are refused
    store.put(Prefix::Meta, b"bad".to_vec(), vec![0xff]).unwrap();
    assert!(store.get_record::<Meta>(b"bad").is_err());
}

#[test]
fn test_sibling_versions_are_isolated() {
    let store = Arc::new(MemoryStore::new());
    let root = VersionDb::new(store.clone());
    let parent = root.child();
    parent.put(Prefix::Account, b"shared".to_vec(), b"p".to_vec()).unwrap();

    let left = parent.child();
    let right = parent.child();
    left.put(Prefix::Account, b"x".to_vec(), b"left".to_vec()).unwrap();
    right.put(Prefix::Account, b"x".to_vec(), b"right".to_vec()).unwrap();

    assert_eq!(left.get(Prefix::Account, b"x").unwrap(), Some(b"left".to_vec()));
    assert_eq!(right.get(Prefix::Account, b"x").unwrap(), Some(b"right".to_vec()));
    assert_eq!(right.get(Prefix::Account, b"shared").unwrap(), Some(b"p".to_vec()));

    parent.commit().unwrap();
    right.discard().unwrap();
    left.commit().unwrap();
    assert_eq!(store.get(Prefix::Account, b"x").unwrap(), Some(b"left".to_vec()));
    assert_eq!(store.get(Prefix::Account, b"shared").unwrap(), Some(b"p".to_vec()));
}

proptest! {
    /// Committed overlays leave the base store equal to applying the same
    /// writes directly.
    #[test]
    fn test_commit_matches_direct_writes(
        ops in prop::collection::vec((0u8..8, prop::option::of(any::<u8>())), 1..40)
    ) {
        let direct = MemoryStore::new();
        let store = Arc::new(MemoryStore::new());
        let db = VersionDb::new(store.clone()).child();
        for (key, value) in &ops {
            match value {
                Some(v) => {
                    direct.put(Prefix::Data, vec![*key], vec![*v]).unwrap();
                    db.put(Prefix::Data, vec![*key], vec![*v]).unwrap();
                }
                None => {
                    direct.delete(Prefix::Data, &[*key]).unwrap();
                    db.delete(Prefix::Data, &[*key]).unwrap();
                }
            }
        }
        db.commit().unwrap();
        for key in 0u8..8 {
            prop_assert_eq!(
                store.get(Prefix::Data, &[key]).unwrap(),
                direct.get(Prefix::Data, &[key]).unwrap()
            );
        }
    }
}

//! Tests for ShardRouter
//!
//! These tests verify:
//! - Stable identifier → bucket addressing
//! - Lazy loading and caching of buckets
//! - Set semantics for values
//! - Unreadable shards degrade to empty buckets

mod common;

use common::{raw_block, MemoryStore};
use shardex::router::{ShardRouter, SHARD_COUNT, SHARD_LABELS};

// =============================================================================
// Addressing Tests
// =============================================================================

#[test]
fn test_bucket_for_is_id_modulo_shard_count() {
    assert_eq!(SHARD_COUNT, 26);
    assert_eq!(ShardRouter::bucket_for(0), "a");
    assert_eq!(ShardRouter::bucket_for(1), "b");
    assert_eq!(ShardRouter::bucket_for(25), "z");
    assert_eq!(ShardRouter::bucket_for(26), "a");
    assert_eq!(ShardRouter::bucket_for(27 * 26 + 3), "d");
}

#[test]
fn test_labels_are_unique() {
    let mut labels = SHARD_LABELS.to_vec();
    labels.sort();
    labels.dedup();
    assert_eq!(labels.len(), SHARD_COUNT);
}

// =============================================================================
// Loading Tests
// =============================================================================

#[test]
fn test_new_router_has_no_resident_buckets() {
    let router = ShardRouter::new();

    assert!(router.resident_labels().is_empty());
    assert!(!router.is_loaded("a"));
}

#[test]
fn test_get_bucket_loads_once() {
    let store = MemoryStore::new();
    store.set_block("c", raw_block(&[("2", vec!["x", "y"])]));
    let mut router = ShardRouter::new();

    let values = router.values(2, &store).unwrap().to_vec();
    assert_eq!(values, vec!["x", "y"]);

    router.values(28, &store);
    router.add_value(54, "z", &store);

    assert_eq!(store.count("read:c"), 1);
    assert_eq!(router.resident_labels(), vec!["c"]);
}

#[test]
fn test_loaded_empty_is_distinct_from_not_loaded() {
    let store = MemoryStore::new();
    let mut router = ShardRouter::new();

    assert!(router.values(3, &store).is_none());

    assert!(router.is_loaded("d"));
    assert!(!router.is_loaded("e"));
}

#[test]
fn test_unreadable_shard_becomes_empty_bucket() {
    let store = MemoryStore::new();
    store.set_block("a", raw_block(&[("0", vec!["lost"])]));
    store.make_unreadable("a");
    let mut router = ShardRouter::new();

    assert!(router.values(0, &store).is_none());
    assert!(router.add_value(0, "fresh", &store));
    assert_eq!(router.values(0, &store).unwrap().to_vec(), vec!["fresh"]);
}

#[test]
fn test_decode_block_skips_non_identifier_labels() {
    let bucket = ShardRouter::decode_block(raw_block(&[
        ("7", vec!["a", "b", "a"]),
        ("not-an-id", vec!["c"]),
    ]));

    assert_eq!(bucket.len(), 1);
    assert_eq!(bucket[&7].to_vec(), vec!["a", "b"]);
}

// =============================================================================
// Mutation Tests
// =============================================================================

#[test]
fn test_add_value_has_set_semantics() {
    let store = MemoryStore::new();
    let mut router = ShardRouter::new();

    assert!(router.add_value(5, "one", &store));
    assert!(router.add_value(5, "two", &store));
    assert!(!router.add_value(5, "one", &store));

    assert_eq!(router.values(5, &store).unwrap().to_vec(), vec!["one", "two"]);
}

#[test]
fn test_remove_drops_all_values() {
    let store = MemoryStore::new();
    let mut router = ShardRouter::new();
    router.add_value(5, "one", &store);
    router.add_value(5, "two", &store);

    let removed = router.remove(5, &store).unwrap();

    assert_eq!(removed.len(), 2);
    assert!(router.values(5, &store).is_none());
    assert!(router.remove(5, &store).is_none());
}

#[test]
fn test_reset_all_marks_every_shard_loaded() {
    let store = MemoryStore::new();
    store.set_block("a", raw_block(&[("0", vec!["old"])]));
    let mut router = ShardRouter::new();

    router.reset_all();

    assert_eq!(router.resident_labels().len(), SHARD_COUNT);
    assert!(router.values(0, &store).is_none());
    assert!(store.log().is_empty());
}

#[test]
fn test_encode_bucket_filters_and_drops_empty_sets() {
    let store = MemoryStore::new();
    let mut router = ShardRouter::new();
    router.add_value(0, "keep", &store);
    router.add_value(26, "orphan", &store);

    let (_, bucket) = router.resident().next().unwrap();
    let block = ShardRouter::encode_bucket(bucket, |id| id == 0);

    assert_eq!(block, raw_block(&[("0", vec!["keep"])]));
}

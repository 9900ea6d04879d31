use std::time::Duration;

use super::store::LocalStore;
use super::types::{CacheEntry, CacheKey, CacheValue};

fn key(name: &str) -> CacheKey {
    CacheKey::new("test", name, &[])
}

fn entry(text: &str) -> CacheEntry {
    CacheEntry::new(CacheValue::Text(text.to_string()), None, Vec::new())
}

fn tagged_entry(text: &str, tags: &[&str]) -> CacheEntry {
    CacheEntry::new(
        CacheValue::Text(text.to_string()),
        None,
        tags.iter().map(|t| t.to_string()).collect(),
    )
}

#[test]
fn test_insert_and_get() {
    let store = LocalStore::new(10);

    assert_eq!(store.insert(key("a"), entry("alpha")), 0);
    assert_eq!(
        store.get(&key("a")),
        Some(CacheValue::Text("alpha".to_string()))
    );
    assert_eq!(store.get(&key("missing")), None);
}

#[test]
fn test_get_touches_recency() {
    let store = LocalStore::new(10);
    store.insert(key("a"), entry("alpha"));

    assert_eq!(store.peek_access_count(&key("a")), Some(0));
    store.get(&key("a"));
    store.get(&key("a"));
    assert_eq!(store.peek_access_count(&key("a")), Some(2));
}

#[test]
fn test_expired_entry_removed_on_get() {
    let store = LocalStore::new(10);
    store.insert(
        key("a"),
        CacheEntry::new(
            CacheValue::Text("alpha".to_string()),
            Some(Duration::from_millis(10)),
            Vec::new(),
        ),
    );

    std::thread::sleep(Duration::from_millis(30));

    assert_eq!(store.get(&key("a")), None);
    // The lazy purge dropped the entry, not just hid it.
    assert_eq!(store.len(), 0);
}

#[test]
fn test_batch_eviction_count() {
    let store = LocalStore::new(10);
    for i in 0..10 {
        store.insert(key(&format!("k{i}")), entry("v"));
        // Keep recency ordering unambiguous on coarse clocks.
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(store.len(), 10);

    // ceil(10 * 0.20) = 2 entries leave in one batch.
    let evicted = store.insert(key("overflow"), entry("v"));
    assert_eq!(evicted, 2);
    assert_eq!(store.len(), 9);
}

#[test]
fn test_eviction_targets_least_recently_accessed() {
    let store = LocalStore::new(5);
    for i in 0..5 {
        store.insert(key(&format!("k{i}")), entry("v"));
        std::thread::sleep(Duration::from_millis(2));
    }

    // Touch the two oldest so they become the most recent.
    store.get(&key("k0"));
    std::thread::sleep(Duration::from_millis(2));
    store.get(&key("k1"));
    std::thread::sleep(Duration::from_millis(2));

    // ceil(5 * 0.2) = 1: k2 is now the least recently accessed.
    let evicted = store.insert(key("overflow"), entry("v"));
    assert_eq!(evicted, 1);
    assert!(!store.contains(&key("k2")));
    assert!(store.contains(&key("k0")));
    assert!(store.contains(&key("k1")));
}

#[test]
fn test_never_accessed_entries_order_by_creation() {
    let store = LocalStore::new(3);
    store.insert(key("oldest"), entry("v"));
    std::thread::sleep(Duration::from_millis(2));
    store.insert(key("middle"), entry("v"));
    std::thread::sleep(Duration::from_millis(2));
    store.insert(key("newest"), entry("v"));
    std::thread::sleep(Duration::from_millis(2));

    let evicted = store.insert(key("overflow"), entry("v"));
    assert_eq!(evicted, 1);
    assert!(!store.contains(&key("oldest")));
    assert!(store.contains(&key("newest")));
}

#[test]
fn test_minimum_one_eviction() {
    let store = LocalStore::new(2);
    store.insert(key("a"), entry("v"));
    std::thread::sleep(Duration::from_millis(2));
    store.insert(key("b"), entry("v"));
    std::thread::sleep(Duration::from_millis(2));

    // ceil(2 * 0.2) = 1 via the minimum rule.
    let evicted = store.insert(key("c"), entry("v"));
    assert_eq!(evicted, 1);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_overwrite_does_not_evict() {
    let store = LocalStore::new(2);
    store.insert(key("a"), entry("v1"));
    store.insert(key("b"), entry("v2"));

    let evicted = store.insert(key("a"), entry("v3"));
    assert_eq!(evicted, 0);
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.get(&key("a")),
        Some(CacheValue::Text("v3".to_string()))
    );
}

#[test]
fn test_remove() {
    let store = LocalStore::new(10);
    store.insert(key("a"), entry("alpha"));

    assert!(store.remove(&key("a")));
    assert!(!store.remove(&key("a")));
    assert_eq!(store.len(), 0);
}

#[test]
fn test_remove_tagged() {
    let store = LocalStore::new(10);
    store.insert(key("a"), tagged_entry("v", &["store:plans"]));
    store.insert(key("b"), tagged_entry("v", &["store:plans", "store:docs"]));
    store.insert(key("c"), tagged_entry("v", &["store:docs"]));
    store.insert(key("d"), entry("untagged"));

    let removed = store.remove_tagged(&["store:plans".to_string()]);
    assert_eq!(removed.len(), 2);
    assert!(!store.contains(&key("a")));
    assert!(!store.contains(&key("b")));
    assert!(store.contains(&key("c")));
    assert!(store.contains(&key("d")));
}

#[test]
fn test_remove_tagged_no_match() {
    let store = LocalStore::new(10);
    store.insert(key("a"), tagged_entry("v", &["store:docs"]));

    let removed = store.remove_tagged(&["store:plans".to_string()]);
    assert!(removed.is_empty());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_remove_namespace() {
    let store = LocalStore::new(10);
    store.insert(CacheKey::new("query", "a", &[]), entry("v"));
    store.insert(CacheKey::new("query", "b", &[]), entry("v"));
    store.insert(CacheKey::new("embedding", "a", &[]), entry("v"));

    let removed = store.remove_namespace("query");
    assert_eq!(removed.len(), 2);
    assert_eq!(store.len(), 1);
    assert!(store.contains(&CacheKey::new("embedding", "a", &[])));
}

#[test]
fn test_purge_expired() {
    let store = LocalStore::new(10);
    store.insert(
        key("dead1"),
        CacheEntry::new(
            CacheValue::Text("v".to_string()),
            Some(Duration::ZERO),
            Vec::new(),
        ),
    );
    store.insert(
        key("dead2"),
        CacheEntry::new(
            CacheValue::Text("v".to_string()),
            Some(Duration::ZERO),
            Vec::new(),
        ),
    );
    store.insert(key("alive"), entry("v"));

    assert_eq!(store.purge_expired(), 2);
    assert_eq!(store.len(), 1);
    assert!(store.contains(&key("alive")));
}

#[test]
fn test_zero_capacity_clamps_to_one() {
    let store = LocalStore::new(0);
    assert_eq!(store.capacity(), 1);

    store.insert(key("a"), entry("v"));
    assert_eq!(store.len(), 1);

    std::thread::sleep(Duration::from_millis(2));
    let evicted = store.insert(key("b"), entry("v"));
    assert_eq!(evicted, 1);
    assert_eq!(store.len(), 1);
}

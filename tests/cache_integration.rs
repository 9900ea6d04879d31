//! Tiered cache behavior exercised through the public handle.

mod common;

use sift::{CacheKey, CacheValue, Config, MockTieredCache, TieredCacheHandle};

use common::fixtures::cache as handle;

fn key(namespace: &str, text: &str) -> CacheKey {
    CacheKey::new(namespace, text, &[])
}

#[tokio::test]
async fn test_set_then_get_round_trip() {
    let cache = handle();
    cache.init().await;

    cache
        .set(&key("query", "q1"), CacheValue::Text("answer".into()), vec![])
        .await;

    assert_eq!(
        cache.get(&key("query", "q1")).await,
        Some(CacheValue::Text("answer".into()))
    );
    assert_eq!(cache.get(&key("query", "q2")).await, None);

    cache.shutdown();
}

#[tokio::test]
async fn test_namespaces_do_not_collide() {
    let cache = handle();

    cache
        .set(&key("query", "same-text"), CacheValue::Text("a".into()), vec![])
        .await;
    cache
        .set(
            &key("embedding", "same-text"),
            CacheValue::Embedding(vec![0.5; 4]),
            vec![],
        )
        .await;

    assert_eq!(
        cache.get(&key("query", "same-text")).await,
        Some(CacheValue::Text("a".into()))
    );
    assert_eq!(
        cache.get(&key("embedding", "same-text")).await,
        Some(CacheValue::Embedding(vec![0.5; 4]))
    );
}

#[tokio::test]
async fn test_tag_invalidation_is_selective() {
    let cache = handle();

    cache
        .set(
            &key("query", "q1"),
            CacheValue::Text("a".into()),
            vec!["store:documents".into()],
        )
        .await;
    cache
        .set(
            &key("query", "q2"),
            CacheValue::Text("b".into()),
            vec!["store:plans".into()],
        )
        .await;

    let removed = cache.invalidate_tags(&["store:documents".to_string()]).await;

    assert_eq!(removed, 1);
    assert_eq!(cache.get(&key("query", "q1")).await, None);
    assert!(cache.get(&key("query", "q2")).await.is_some());
}

#[tokio::test]
async fn test_clear_namespace_leaves_others() {
    let cache = handle();

    cache
        .set(&key("query", "q1"), CacheValue::Text("a".into()), vec![])
        .await;
    cache
        .set(
            &key("embedding", "e1"),
            CacheValue::Embedding(vec![1.0]),
            vec![],
        )
        .await;

    assert_eq!(cache.clear_namespace("query").await, 1);
    assert_eq!(cache.get(&key("query", "q1")).await, None);
    assert!(cache.get(&key("embedding", "e1")).await.is_some());
}

#[tokio::test]
async fn test_remote_tier_receives_writes() {
    let cache = handle();
    cache.init().await;
    assert!(cache.is_remote_active());

    cache
        .set(&key("query", "q1"), CacheValue::Text("a".into()), vec![])
        .await;

    assert!(cache.cache().mock_remote().set_calls() >= 1);
}

#[tokio::test]
async fn test_failed_init_ping_disables_remote_permanently() {
    let mock = MockTieredCache::new_mock();
    mock.mock_remote().set_fail_ping(true);
    let cache = TieredCacheHandle::new(mock);

    cache.init().await;
    assert!(!cache.is_remote_active());

    // Commands recover, but the tier stays out for the process.
    cache.cache().mock_remote().set_fail_ping(false);
    cache
        .set(&key("query", "q1"), CacheValue::Text("a".into()), vec![])
        .await;

    assert!(!cache.is_remote_active());
    assert_eq!(cache.cache().mock_remote().set_calls(), 0);
    // Local service continues.
    assert!(cache.get(&key("query", "q1")).await.is_some());
}

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let cache = handle();

    cache
        .set(&key("query", "q1"), CacheValue::Text("a".into()), vec![])
        .await;
    cache.get(&key("query", "q1")).await;
    cache.get(&key("query", "missing")).await;

    let stats = cache.stats();
    assert_eq!(stats.sets, 1);
    assert!(stats.hits >= 1);
    assert!(stats.misses >= 1);
    assert!(stats.hit_rate > 0.0);
}

#[tokio::test]
async fn test_config_derived_cache_respects_capacity() {
    let mut config = Config::default();
    config.local_capacity = 4;

    let cache = TieredCacheHandle::new(MockTieredCache::new_mock_with_config(config.cache_config()));

    for i in 0..8 {
        cache
            .set(
                &key("query", &format!("q{i}")),
                CacheValue::Text("x".into()),
                vec![],
            )
            .await;
    }

    assert!(cache.stats().entries <= 4);
    assert!(cache.stats().evictions >= 1);
}

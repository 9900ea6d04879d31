//! End-to-end engine tests over the public API.

mod common;

use std::collections::BTreeMap;

use sift::{
    BoostConfig, IndexKind, MetaValue, MockRemoteTier, ResponseStatus, ResultRanker,
    SearchOrchestrator, SearchResult, StubEmbedder, VectorIndexHandle, VectorRecord,
};

use common::fixtures::{cache, embeddings, index_config};

async fn engine() -> SearchOrchestrator<StubEmbedder, MockRemoteTier> {
    let cache = cache();
    let embeddings = embeddings(cache.clone());

    let documents =
        VectorIndexHandle::create("documents", embeddings.clone(), index_config(IndexKind::Exact))
            .unwrap();
    documents
        .add(&[
            VectorRecord::new("doc-refunds", "how to file a refund request")
                .with_field("title", "Refund Policy"),
            VectorRecord::new("doc-warranty", "warranty coverage for water damage"),
        ])
        .await
        .unwrap();

    let plans =
        VectorIndexHandle::create("plans", embeddings.clone(), index_config(IndexKind::Exact))
            .unwrap();
    plans
        .add(&[VectorRecord::new(
            "plan-q3",
            "quarterly roadmap for the billing team",
        )])
        .await
        .unwrap();

    SearchOrchestrator::builder(embeddings, cache)
        .store("documents", documents)
        .store("plans", plans)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_full_lifecycle() {
    let engine = engine().await;
    engine.init().await;

    let response = engine.ask("how to file a refund request", 5, true).await;
    assert_eq!(response.status, ResponseStatus::Complete);
    assert_eq!(response.results[0].external_id, "doc-refunds");
    assert_eq!(response.results[0].store, "documents");
    assert!(!response.cache_hit);
    assert!(response.search_time_ms >= 0.0);

    engine.shutdown();
}

#[tokio::test]
async fn test_repeated_question_served_from_cache() {
    let engine = engine().await;

    let first = engine.ask("how to file a refund request", 5, true).await;
    let second = engine.ask("how to file a refund request", 5, true).await;

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(second.results, first.results);
}

#[tokio::test]
async fn test_indexing_new_documents_refreshes_answers() {
    let engine = engine().await;

    engine.ask("how to file a refund request", 5, true).await;
    assert!(engine.ask("how to file a refund request", 5, true).await.cache_hit);

    engine
        .add_documents(
            "documents",
            &[VectorRecord::new("doc-escalation", "escalating a support case")],
        )
        .await
        .unwrap();

    assert!(!engine.ask("how to file a refund request", 5, true).await.cache_hit);
}

#[tokio::test]
async fn test_responses_without_sources_carry_no_metadata() {
    let engine = engine().await;

    let response = engine.ask("how to file a refund request", 5, false).await;

    assert!(!response.results.is_empty());
    assert!(response.results.iter().all(|r| r.metadata.is_empty()));
}

fn single_hit(store: &str, id: &str, score: f32, metadata: sift::MetadataMap) -> SearchResult {
    SearchResult {
        ids: vec![id.to_string()],
        scores: vec![score],
        metadata: vec![metadata],
        search_time_ms: 1.0,
        total_results: 1,
        index_name: store.to_string(),
        cache_hit: false,
    }
}

#[tokio::test]
async fn test_store_boost_decides_close_race() {
    // Doc A leads on raw similarity (0.92 vs 0.85), but the 1.1
    // multiplier on the plans store lifts doc B to 0.935.
    let ranker = ResultRanker::new(0.7, BoostConfig::default().with_store("plans", 1.1));

    let per_store = BTreeMap::from([
        (
            "documents".to_string(),
            single_hit("documents", "doc-a", 0.92, sift::MetadataMap::new()),
        ),
        (
            "plans".to_string(),
            single_hit("plans", "doc-b", 0.85, sift::MetadataMap::new()),
        ),
    ]);

    let ranked = ranker.rank(ranker.merge(&per_store), 2);

    assert_eq!(ranked[0].external_id, "doc-b");
    assert!((ranked[0].boosted_score - 0.935).abs() < 1e-6);
    assert_eq!(ranked[1].external_id, "doc-a");
}

#[tokio::test]
async fn test_high_value_metadata_flips_close_race() {
    // With title, section, and timestamp present, doc A climbs to
    // 0.92 * 1.06 = 0.9752 and overtakes the boosted doc B.
    let ranker = ResultRanker::new(0.7, BoostConfig::default().with_store("plans", 1.1));

    let mut rich = sift::MetadataMap::new();
    rich.insert("title".to_string(), MetaValue::from("Refund Policy"));
    rich.insert("section".to_string(), MetaValue::from("3.1"));
    rich.insert("timestamp".to_string(), MetaValue::from("2026-08-24"));

    let per_store = BTreeMap::from([
        (
            "documents".to_string(),
            single_hit("documents", "doc-a", 0.92, rich),
        ),
        (
            "plans".to_string(),
            single_hit("plans", "doc-b", 0.85, sift::MetadataMap::new()),
        ),
    ]);

    let ranked = ranker.rank(ranker.merge(&per_store), 2);

    assert_eq!(ranked[0].external_id, "doc-a");
    assert!((ranked[0].boosted_score - 0.9752).abs() < 1e-6);
    assert_eq!(ranked[1].external_id, "doc-b");
}

//! Shared builders for the integration suites.

#![allow(dead_code)]

use sift::{
    EmbeddingCache, EmbeddingCacheHandle, IndexConfig, IndexKind, MockRemoteTier, MockTieredCache,
    StubEmbedder, TieredCacheHandle,
};

pub const DIM: usize = 32;

pub fn cache() -> TieredCacheHandle<MockRemoteTier> {
    TieredCacheHandle::new(MockTieredCache::new_mock())
}

pub fn embeddings(
    cache: TieredCacheHandle<MockRemoteTier>,
) -> EmbeddingCacheHandle<StubEmbedder, MockRemoteTier> {
    EmbeddingCacheHandle::new(EmbeddingCache::new(StubEmbedder::new(DIM), cache))
}

/// Embedding handle over its own private cache.
pub fn fresh_embeddings() -> EmbeddingCacheHandle<StubEmbedder, MockRemoteTier> {
    embeddings(cache())
}

pub fn index_config(kind: IndexKind) -> IndexConfig {
    IndexConfig {
        kind,
        dimension: DIM,
        ..IndexConfig::default()
    }
}

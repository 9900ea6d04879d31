//! Sift: a tiered cache and multi-store vector retrieval engine.
//!
//! The crate is organized around three layers:
//!
//! - [`cache`] — a two-tier cache (local LRU plus an optional remote
//!   Redis tier) with per-namespace TTLs, tag invalidation, and
//!   transparent compression of large remote frames.
//! - [`index`] — embedding-backed vector stores with exact, clustered,
//!   and graph search implementations behind one [`index::AnnIndex`],
//!   plus atomic snapshot persistence.
//! - [`orchestrator`] — concurrent fan-out over named stores, boosted
//!   cross-store re-ranking, and cached ranked responses.
//!
//! [`embedding`] supplies the vectors (an OpenAI-compatible HTTP client
//! or the deterministic stub), [`scoring`] the merge and rank pass, and
//! [`config`] the `SIFT_*` environment settings that wire everything
//! together.
//!
//! # Construction path
//!
//! Build the shared cache first, wrap the embedder in its cache-backed
//! handle, create or load the stores, then hand everything to the
//! orchestrator and call [`SearchOrchestrator::init`]:
//!
//! ```no_run
//! use sift::{
//!     Config, EmbeddingCache, EmbeddingCacheHandle, RedisTier, ResultRanker,
//!     SearchOrchestrator, StubEmbedder, TieredCache, TieredCacheHandle,
//!     VectorIndexHandle, VectorRecord,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! config.validate()?;
//!
//! let cache = TieredCacheHandle::new(TieredCache::<RedisTier>::new(
//!     None,
//!     config.cache_config(),
//! ));
//! let embeddings = EmbeddingCacheHandle::new(EmbeddingCache::new(
//!     StubEmbedder::new(config.embedding_dim),
//!     cache.clone(),
//! ));
//!
//! let documents =
//!     VectorIndexHandle::create("documents", embeddings.clone(), config.index_config())?;
//! documents
//!     .add(&[VectorRecord::new(
//!         "doc-1",
//!         "warranty coverage for water damage",
//!     )])
//!     .await?;
//!
//! let orchestrator = SearchOrchestrator::builder(embeddings, cache)
//!     .store("documents", documents)
//!     .config(config.orchestrator_config())
//!     .ranker(ResultRanker::new(
//!         config.similarity_threshold,
//!         config.boost_config(),
//!     ))
//!     .build()?;
//! orchestrator.init().await;
//!
//! let response = orchestrator.ask("water damage warranty", 5, true).await;
//! println!("{} results ({:?})", response.results.len(), response.status);
//!
//! orchestrator.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Test/Mock Support
//!
//! Mock implementations ([`MockTieredCache`], [`MockRemoteTier`]) are
//! available behind `#[cfg(any(test, feature = "mock"))]`; the
//! [`StubEmbedder`] is always available.

pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod hashing;
pub mod index;
pub mod orchestrator;
pub mod scoring;

pub use cache::{
    CacheConfig, CacheEntry, CacheKey, CacheStats, CacheValue, LocalStore, RedisTier, RemoteTier,
    TieredCache, TieredCacheHandle,
};
#[cfg(any(test, feature = "mock"))]
pub use cache::{MockRemoteTier, MockTieredCache};

pub use config::{Config, ConfigError};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
pub use embedding::{
    Embedder, EmbeddingCache, EmbeddingCacheHandle, EmbeddingError, HttpEmbedder, StubEmbedder,
};
pub use hashing::{canonical_params, hash_cache_key, hash_text, hash_to_u64, hex_digest};
pub use index::{
    AnnIndex, FilterCondition, IndexConfig, IndexError, IndexKind, IndexStats, MetaValue,
    MetadataFilter, MetadataMap, SearchResult, VectorIndex, VectorIndexHandle, VectorRecord,
};
pub use orchestrator::{
    OrchestratorConfig, OrchestratorError, RankedResponse, ResponseStatus, ResultCache,
    SearchOrchestrator, SearchOrchestratorBuilder,
};
pub use scoring::{BoostConfig, RankedResult, ResultRanker};

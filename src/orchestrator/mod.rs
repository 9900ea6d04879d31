//! Multi-store search orchestration.
//!
//! Fans a query out to every registered store concurrently, merges and
//! re-ranks the per-store results, and short-circuits repeated queries
//! through the result cache. Store failures degrade the response; they
//! never fail it.

pub mod result_cache;


pub use result_cache::ResultCache;

use std::collections::BTreeMap;
use std::time::Instant;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStats, RemoteTier, TieredCacheHandle};
use crate::constants::{DEFAULT_MAX_TOP_K, DEFAULT_SIMILARITY_THRESHOLD};
use crate::embedding::{Embedder, EmbeddingCacheHandle};
use crate::index::{IndexStats, SearchResult, VectorIndexHandle, VectorRecord};
use crate::scoring::{RankedResult, ResultRanker};

/// Tuning for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Raw-score floor for ranked results.
    pub similarity_threshold: f32,
    /// Upper bound applied to requested `k`.
    pub max_top_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("store {name} is registered twice")]
    DuplicateStore { name: String },

    #[error("no stores registered")]
    NoStores,

    #[error("unknown store: {name}")]
    UnknownStore { name: String },

    #[error(transparent)]
    Index(#[from] crate::index::IndexError),
}

/// Outcome quality of a ranked query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Every selected store answered.
    Complete,
    /// At least one store failed; results cover the rest.
    Degraded,
    /// Every selected store failed.
    Unavailable,
}

/// Ranked answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResponse {
    pub results: Vec<RankedResult>,
    /// Stores that answered, in name order.
    pub stores_searched: Vec<String>,
    /// Stores that failed and were skipped.
    pub stores_failed: Vec<String>,
    pub status: ResponseStatus,
    pub search_time_ms: f64,
    pub cache_hit: bool,
}

impl RankedResponse {
    fn empty(status: ResponseStatus, stores_failed: Vec<String>, search_time_ms: f64) -> Self {
        Self {
            results: Vec::new(),
            stores_searched: Vec::new(),
            stores_failed,
            status,
            search_time_ms,
            cache_hit: false,
        }
    }
}

/// Coordinates named stores, the shared caches, and the ranker.
///
/// Built via [`SearchOrchestrator::builder`]; owns the tiered cache's
/// lifecycle ([`init`](SearchOrchestrator::init) /
/// [`shutdown`](SearchOrchestrator::shutdown)).
pub struct SearchOrchestrator<E: Embedder, R: RemoteTier> {
    stores: BTreeMap<String, VectorIndexHandle<E, R>>,
    embeddings: EmbeddingCacheHandle<E, R>,
    cache: TieredCacheHandle<R>,
    results: ResultCache<R>,
    ranker: ResultRanker,
    config: OrchestratorConfig,
}

impl<E: Embedder, R: RemoteTier> SearchOrchestrator<E, R> {
    pub fn builder(
        embeddings: EmbeddingCacheHandle<E, R>,
        cache: TieredCacheHandle<R>,
    ) -> SearchOrchestratorBuilder<E, R> {
        SearchOrchestratorBuilder {
            stores: BTreeMap::new(),
            duplicate: None,
            embeddings,
            cache,
            ranker: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Probes the remote cache tier and starts the expiry sweep.
    pub async fn init(&self) {
        self.cache.init().await;
        info!(stores = self.stores.len(), "search orchestrator ready");
    }

    /// Stops the cache's background work. Idempotent; in-flight
    /// queries are unaffected.
    pub fn shutdown(&self) {
        self.cache.shutdown();
    }

    /// Registered store names, in order.
    pub fn store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    pub fn store(&self, name: &str) -> Option<&VectorIndexHandle<E, R>> {
        self.stores.get(name)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Searches every configured store (or the named subset)
    /// concurrently and returns the per-store results. Failed stores
    /// are logged and omitted.
    #[instrument(skip(self, query), fields(k, query_len = query.len()))]
    pub async fn search_all(
        &self,
        query: &str,
        k: usize,
        store_names: Option<&[String]>,
    ) -> BTreeMap<String, SearchResult> {
        self.fan_out(query, k, store_names).await.0
    }

    /// Answers a query with a ranked, boosted, cached response.
    ///
    /// A cache hit returns the stored payload verbatim, flagged as a
    /// hit, without touching any store. `include_sources = false`
    /// strips metadata from the returned results. The response is
    /// always well formed: store failures show up as a degraded or
    /// unavailable status, never as an error.
    #[instrument(skip(self, query), fields(k, include_sources, query_len = query.len()))]
    pub async fn ask(&self, query: &str, k: usize, include_sources: bool) -> RankedResponse {
        let started = Instant::now();
        let k = k.min(self.config.max_top_k);
        if k == 0 {
            return RankedResponse::empty(ResponseStatus::Complete, Vec::new(), 0.0);
        }

        if let Some(mut cached) = self.results.get(query, k, include_sources).await {
            debug!("ranked response served from cache");
            cached.cache_hit = true;
            return cached;
        }

        let (per_store, stores_failed) = self.fan_out(query, k, None).await;

        if per_store.is_empty() && !stores_failed.is_empty() {
            // Caching an outage would pin it for the namespace TTL.
            info!(
                failed = stores_failed.len(),
                "every store failed, returning unavailable response"
            );
            return RankedResponse::empty(
                ResponseStatus::Unavailable,
                stores_failed,
                elapsed_ms(started),
            );
        }

        let stores_searched: Vec<String> = per_store.keys().cloned().collect();
        let candidates = self.ranker.merge(&per_store);
        let mut results = self.ranker.rank(candidates, k);
        if !include_sources {
            for result in &mut results {
                result.metadata.clear();
            }
        }

        let status = if stores_failed.is_empty() {
            ResponseStatus::Complete
        } else {
            ResponseStatus::Degraded
        };
        let response = RankedResponse {
            results,
            stores_searched,
            stores_failed,
            status,
            search_time_ms: elapsed_ms(started),
            cache_hit: false,
        };

        self.results.put(query, k, include_sources, &response).await;
        response
    }

    /// Indexes documents into a named store, then invalidates every
    /// cached response that store contributed to.
    #[instrument(skip(self, records), fields(store, batch = records.len()))]
    pub async fn add_documents(
        &self,
        store: &str,
        records: &[VectorRecord],
    ) -> Result<usize, OrchestratorError> {
        let handle = self
            .stores
            .get(store)
            .ok_or_else(|| OrchestratorError::UnknownStore {
                name: store.to_string(),
            })?;

        let added = handle.add(records).await?;
        let invalidated = self.invalidate_store_results(store).await;
        debug!(added, invalidated, "store updated");
        Ok(added)
    }

    /// Drops cached responses the store contributed to.
    pub async fn invalidate_store_results(&self, store: &str) -> usize {
        self.results.invalidate_store(store).await
    }

    /// Drops every cached response.
    pub async fn clear_result_cache(&self) -> usize {
        self.results.clear().await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn store_stats(&self) -> Vec<IndexStats> {
        join_all(self.stores.values().map(|handle| handle.stats())).await
    }

    /// Runs the per-store searches for `ask` and `search_all`. Returns
    /// the successful results plus the names of the stores that
    /// failed. The query is embedded once up front so the concurrent
    /// store searches all hit the embedding cache; an embedding
    /// failure therefore fails every selected store identically.
    async fn fan_out(
        &self,
        query: &str,
        k: usize,
        store_names: Option<&[String]>,
    ) -> (BTreeMap<String, SearchResult>, Vec<String>) {
        let k = k.min(self.config.max_top_k);
        if k == 0 {
            return (BTreeMap::new(), Vec::new());
        }

        let selected: Vec<(String, VectorIndexHandle<E, R>)> = match store_names {
            None => self
                .stores
                .iter()
                .map(|(name, handle)| (name.clone(), handle.clone()))
                .collect(),
            Some(names) => names
                .iter()
                .filter_map(|name| match self.stores.get(name) {
                    Some(handle) => Some((name.clone(), handle.clone())),
                    None => {
                        warn!(store = %name, "unknown store requested, skipping");
                        None
                    }
                })
                .collect(),
        };
        if selected.is_empty() {
            return (BTreeMap::new(), Vec::new());
        }

        if let Err(e) = self.embeddings.embed_one(query).await {
            warn!(error = %e, "query embedding failed, no stores searched");
            let failed = selected.into_iter().map(|(name, _)| name).collect();
            return (BTreeMap::new(), failed);
        }

        let searches = selected.into_iter().map(|(name, handle)| async move {
            let outcome = handle.search(query, k, None).await;
            (name, outcome)
        });

        let mut results = BTreeMap::new();
        let mut failed = Vec::new();
        for (name, outcome) in join_all(searches).await {
            match outcome {
                Ok(result) => {
                    results.insert(name, result);
                }
                Err(e) => {
                    warn!(store = %name, error = %e, "store search failed, continuing without it");
                    failed.push(name);
                }
            }
        }

        (results, failed)
    }
}

impl<E: Embedder, R: RemoteTier> std::fmt::Debug for SearchOrchestrator<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("stores", &self.store_names())
            .field("max_top_k", &self.config.max_top_k)
            .field("similarity_threshold", &self.config.similarity_threshold)
            .finish()
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Staged construction for [`SearchOrchestrator`].
pub struct SearchOrchestratorBuilder<E: Embedder, R: RemoteTier> {
    stores: BTreeMap<String, VectorIndexHandle<E, R>>,
    duplicate: Option<String>,
    embeddings: EmbeddingCacheHandle<E, R>,
    cache: TieredCacheHandle<R>,
    ranker: Option<ResultRanker>,
    config: OrchestratorConfig,
}

impl<E: Embedder, R: RemoteTier> SearchOrchestratorBuilder<E, R> {
    /// Registers a named store. Duplicate names surface at
    /// [`build`](SearchOrchestratorBuilder::build).
    pub fn store(mut self, name: impl Into<String>, handle: VectorIndexHandle<E, R>) -> Self {
        let name = name.into();
        if self.stores.insert(name.clone(), handle).is_some() {
            self.duplicate.get_or_insert(name);
        }
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ranker(mut self, ranker: ResultRanker) -> Self {
        self.ranker = Some(ranker);
        self
    }

    pub fn build(self) -> Result<SearchOrchestrator<E, R>, OrchestratorError> {
        if let Some(name) = self.duplicate {
            return Err(OrchestratorError::DuplicateStore { name });
        }
        if self.stores.is_empty() {
            return Err(OrchestratorError::NoStores);
        }

        let ranker = self.ranker.unwrap_or_else(|| {
            ResultRanker::new(self.config.similarity_threshold, Default::default())
        });

        Ok(SearchOrchestrator {
            stores: self.stores,
            embeddings: self.embeddings,
            results: ResultCache::new(self.cache.clone()),
            cache: self.cache,
            ranker,
            config: self.config,
        })
    }
}

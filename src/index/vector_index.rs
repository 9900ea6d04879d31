//! A named vector store: one search index plus its id and metadata
//! tables, fed by the shared embedding cache.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::cache::RemoteTier;
use crate::constants::OVERFETCH_FACTOR;
use crate::embedding::{Embedder, EmbeddingCacheHandle};

use super::ann::AnnIndex;
use super::config::IndexConfig;
use super::error::{IndexError, IndexResult};
use super::filter::MetadataFilter;
use super::model::{IndexStats, MetadataMap, SearchResult, VectorRecord};
use super::persist;

/// One document store.
///
/// Owns the search index and the row-indexed `external_ids` and
/// `metadata` tables; every mutation goes through [`VectorIndex::add`]
/// or the load path, so the three stay aligned by construction.
pub struct VectorIndex<E: Embedder, R: RemoteTier> {
    name: String,
    index: AnnIndex,
    external_ids: Vec<String>,
    metadata: Vec<MetadataMap>,
    embeddings: EmbeddingCacheHandle<E, R>,
    config: IndexConfig,
}

impl<E: Embedder, R: RemoteTier> VectorIndex<E, R> {
    /// Creates an empty store.
    ///
    /// Fails when the name is empty, the configured dimension is zero,
    /// or the embedder's output dimension disagrees with the config.
    pub fn new(
        name: impl Into<String>,
        embeddings: EmbeddingCacheHandle<E, R>,
        config: IndexConfig,
    ) -> IndexResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(IndexError::EmptyName);
        }
        if config.dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        if embeddings.dimension() != config.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: config.dimension,
                actual: embeddings.dimension(),
            });
        }

        Ok(Self {
            name,
            index: AnnIndex::new(&config),
            external_ids: Vec::new(),
            metadata: Vec::new(),
            embeddings,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            name: self.name.clone(),
            kind: self.index.kind(),
            vectors: self.index.len(),
            dimension: self.index.dimension(),
            memory_bytes: self.index.memory_bytes(),
        }
    }

    /// Indexes a batch of documents with one embedding call.
    ///
    /// Every embedding is validated against the store dimension before
    /// any row is appended, so a mismatch leaves the store untouched.
    /// Returns the number of documents added.
    #[instrument(skip(self, records), fields(store = %self.name, batch = records.len()))]
    pub async fn add(&mut self, records: &[VectorRecord]) -> IndexResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embeddings.embed_many(&texts).await?;

        let expected = self.index.dimension();
        for vector in &vectors {
            if vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        for (record, vector) in records.iter().zip(&vectors) {
            self.index.add(vector);
            self.external_ids.push(record.external_id.clone());
            self.metadata.push(record.metadata.clone());
        }

        debug!(total = self.index.len(), "documents indexed");
        Ok(records.len())
    }

    /// Embeds a query through the shared cache, validating the result
    /// dimension.
    pub async fn embed_query(&self, text: &str) -> IndexResult<Vec<f32>> {
        let vector = self.embeddings.embed_one(text).await?;
        let expected = self.index.dimension();
        if vector.len() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    /// Requested `k` bounded by the configured maximum.
    pub fn clamp_k(&self, k: usize) -> usize {
        k.min(self.config.max_top_k)
    }

    /// Searches with an already-embedded query. CPU-bound; the handle
    /// runs this on the blocking pool.
    ///
    /// Over-fetches `2k` candidates so metadata filtering does not
    /// starve the result, drops candidates whose row has no sidecar
    /// entry, then truncates to `k`. `total_results` counts everything
    /// that survived the filter, before truncation.
    pub fn execute(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> SearchResult {
        let candidates = self.index.search(query, k.saturating_mul(OVERFETCH_FACTOR));

        let mut result = SearchResult::empty(self.name.clone());
        for scored in candidates {
            let row = scored.id as usize;
            let (Some(external_id), Some(metadata)) =
                (self.external_ids.get(row), self.metadata.get(row))
            else {
                warn!(
                    store = %self.name,
                    row = scored.id,
                    "candidate row has no sidecar entry, skipping"
                );
                continue;
            };

            if filter.is_some_and(|f| !f.matches(metadata)) {
                continue;
            }

            result.total_results += 1;
            if result.ids.len() < k {
                result.ids.push(external_id.clone());
                result.scores.push(scored.score);
                result.metadata.push(metadata.clone());
            }
        }

        result
    }

    /// Convenience search without the handle's blocking-pool offload.
    #[instrument(skip(self, query_text, filter), fields(store = %self.name, k))]
    pub async fn search(
        &self,
        query_text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> IndexResult<SearchResult> {
        let started = Instant::now();
        let k = self.clamp_k(k);
        if k == 0 {
            return Ok(SearchResult::empty(self.name.clone()));
        }

        let query = self.embed_query(query_text).await?;
        let mut result = self.execute(&query, k, filter);
        result.search_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        Ok(result)
    }
}

impl<E: Embedder, R: RemoteTier> std::fmt::Debug for VectorIndex<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("name", &self.name)
            .field("kind", &self.index.kind())
            .field("vectors", &self.index.len())
            .field("dimension", &self.index.dimension())
            .finish()
    }
}

/// Cloneable handle to one shared [`VectorIndex`].
///
/// Searches take a read lock (and run the scan on the blocking pool);
/// `add`, `load`, and `save` snapshots take the write or read lock for
/// their full duration, so mutation never overlaps a scan.
pub struct VectorIndexHandle<E: Embedder, R: RemoteTier> {
    inner: Arc<RwLock<VectorIndex<E, R>>>,
}

impl<E: Embedder, R: RemoteTier> Clone for VectorIndexHandle<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Embedder, R: RemoteTier> VectorIndexHandle<E, R> {
    pub fn new(index: VectorIndex<E, R>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// Creates an empty store behind a handle.
    pub fn create(
        name: impl Into<String>,
        embeddings: EmbeddingCacheHandle<E, R>,
        config: IndexConfig,
    ) -> IndexResult<Self> {
        Ok(Self::new(VectorIndex::new(name, embeddings, config)?))
    }

    /// Loads a persisted store. The snapshot decides the index kind
    /// and dimension; runtime tuning comes from `config` afterwards.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        embeddings: EmbeddingCacheHandle<E, R>,
        config: IndexConfig,
    ) -> IndexResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(IndexError::EmptyName);
        }

        let path = path.as_ref().to_path_buf();
        let loaded = tokio::task::spawn_blocking(move || persist::load_sync(&path))
            .await
            .map_err(|e| IndexError::Internal {
                reason: e.to_string(),
            })?;
        let (snapshot, sidecar) = loaded?;

        if embeddings.dimension() != sidecar.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: sidecar.dimension,
                actual: embeddings.dimension(),
            });
        }

        let index = persist::index_from_snapshot(snapshot, &config)?;
        info!(
            store = %name,
            kind = %index.kind(),
            vectors = index.len(),
            "store index loaded"
        );

        Ok(Self::new(VectorIndex {
            name,
            index,
            external_ids: sidecar.external_ids,
            metadata: sidecar.metadata,
            embeddings,
            config,
        }))
    }

    /// Persists the store's snapshot/sidecar pair.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn save(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        // Snapshot under the read lock, write files outside it.
        let (snapshot, sidecar, name) = {
            let guard = self.inner.read().await;
            let snapshot = persist::snapshot_of(&guard.index);
            let sidecar = persist::Sidecar {
                dimension: guard.index.dimension(),
                count: guard.index.len(),
                external_ids: guard.external_ids.clone(),
                metadata: guard.metadata.clone(),
            };
            (snapshot, sidecar, guard.name.clone())
        };

        let vectors = sidecar.count;
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || persist::save_sync(&path, &snapshot, &sidecar))
            .await
            .map_err(|e| IndexError::Internal {
                reason: e.to_string(),
            })??;

        info!(store = %name, vectors, "store index saved");
        Ok(())
    }

    /// Embeds the query under a read lock, then runs the scan on the
    /// blocking pool with an owned guard so the executor stays free.
    pub async fn search(
        &self,
        query_text: &str,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> IndexResult<SearchResult> {
        let started = Instant::now();
        let guard = Arc::clone(&self.inner).read_owned().await;

        let k = guard.clamp_k(k);
        if k == 0 {
            return Ok(SearchResult::empty(guard.name().to_string()));
        }

        let query = guard.embed_query(query_text).await?;
        let mut result =
            tokio::task::spawn_blocking(move || guard.execute(&query, k, filter.as_ref()))
                .await
                .map_err(|e| IndexError::Internal {
                    reason: e.to_string(),
                })?;

        result.search_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        Ok(result)
    }

    pub async fn add(&self, records: &[VectorRecord]) -> IndexResult<usize> {
        self.inner.write().await.add(records).await
    }

    pub async fn stats(&self) -> IndexStats {
        self.inner.read().await.stats()
    }

    pub async fn name(&self) -> String {
        self.inner.read().await.name.clone()
    }

    /// Number of live handles to the shared store.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<E: Embedder, R: RemoteTier> std::fmt::Debug for VectorIndexHandle<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndexHandle")
            .field("strong_count", &Arc::strong_count(&self.inner))
            .finish()
    }
}

//! Cache-backed embedding front.
//!
//! Wraps any [`Embedder`] with the shared tiered cache. Keys are the
//! hex digest of the text hash under the `embedding` namespace, so
//! identical text embedded by different stores shares one entry.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, CacheValue, RemoteTier, TieredCacheHandle};
use crate::constants::NS_EMBEDDING;
use crate::hashing::{hash_text, hex_digest};

use super::{Embedder, EmbeddingError};

pub struct EmbeddingCache<E: Embedder, R: RemoteTier> {
    embedder: E,
    cache: TieredCacheHandle<R>,
}

impl<E: Embedder, R: RemoteTier> EmbeddingCache<E, R> {
    pub fn new(embedder: E, cache: TieredCacheHandle<R>) -> Self {
        Self { embedder, cache }
    }

    /// Output dimension of the wrapped embedder.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Wrapped embedder, exposed for diagnostics.
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Embeds one text, consulting the cache first.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = Self::cache_key(text);

        match self.cache.get(&key).await {
            Some(CacheValue::Embedding(vector)) => {
                debug!("embedding cache hit");
                return Ok(vector);
            }
            Some(_) => {
                warn!("embedding cache entry held a non-embedding value, recomputing");
            }
            None => {}
        }

        let mut vectors = self.embedder.embed_many(&[text.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| EmbeddingError::MalformedResponse {
                reason: "provider returned no vector for single input".to_string(),
            })?;

        self.cache
            .set(&key, CacheValue::Embedding(vector.clone()), Vec::new())
            .await;

        Ok(vector)
    }

    /// Embeds a batch, consulting the cache per text and issuing one
    /// provider call for all the misses together.
    #[instrument(skip(self, texts), fields(batch = texts.len()))]
    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolved: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut miss_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = Self::cache_key(text);
            match self.cache.get(&key).await {
                Some(CacheValue::Embedding(vector)) => resolved[i] = Some(vector),
                Some(_) => {
                    warn!("embedding cache entry held a non-embedding value, recomputing");
                    miss_indices.push(i);
                }
                None => miss_indices.push(i),
            }
        }

        if !miss_indices.is_empty() {
            let missing: Vec<String> = miss_indices.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.embedder.embed_many(&missing).await?;
            if vectors.len() != missing.len() {
                return Err(EmbeddingError::MalformedResponse {
                    reason: format!(
                        "expected {} embeddings, got {}",
                        missing.len(),
                        vectors.len()
                    ),
                });
            }

            for (&i, vector) in miss_indices.iter().zip(vectors) {
                let key = Self::cache_key(&texts[i]);
                self.cache
                    .set(&key, CacheValue::Embedding(vector.clone()), Vec::new())
                    .await;
                resolved[i] = Some(vector);
            }
        }

        debug!(
            hits = texts.len() - miss_indices.len(),
            misses = miss_indices.len(),
            "embedding batch resolved"
        );

        resolved
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EmbeddingError::MalformedResponse {
                reason: "embedding batch left an input unresolved".to_string(),
            })
    }

    fn cache_key(text: &str) -> CacheKey {
        CacheKey::new(NS_EMBEDDING, &hex_digest(&hash_text(text)), &[])
    }
}

impl<E: Embedder, R: RemoteTier> std::fmt::Debug for EmbeddingCache<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("dimension", &self.embedder.dimension())
            .finish()
    }
}

/// Cloneable handle sharing one [`EmbeddingCache`] across store
/// indexes and the orchestrator.
pub struct EmbeddingCacheHandle<E: Embedder, R: RemoteTier> {
    inner: Arc<EmbeddingCache<E, R>>,
}

impl<E: Embedder, R: RemoteTier> Clone for EmbeddingCacheHandle<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Embedder, R: RemoteTier> EmbeddingCacheHandle<E, R> {
    pub fn new(cache: EmbeddingCache<E, R>) -> Self {
        Self {
            inner: Arc::new(cache),
        }
    }

    pub fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.inner.embed_one(text).await
    }

    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.inner.embed_many(texts).await
    }

    /// Shared cache behind this handle.
    pub fn cache(&self) -> &EmbeddingCache<E, R> {
        &self.inner
    }

    /// Number of live handles to the shared cache.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<E: Embedder, R: RemoteTier> std::fmt::Debug for EmbeddingCacheHandle<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCacheHandle")
            .field("strong_count", &Arc::strong_count(&self.inner))
            .finish()
    }
}

//! Cached ranked responses.
//!
//! Lives in the `query` namespace of the shared tiered cache, keyed by
//! the query text plus the `k` and source-inclusion parameters. Every
//! entry is tagged with the stores that contributed to it, so indexing
//! new documents into a store can invalidate exactly the responses
//! that store helped produce.

use tracing::warn;

use crate::cache::{CacheKey, CacheValue, RemoteTier, TieredCacheHandle};
use crate::constants::NS_QUERY;

use super::RankedResponse;

pub struct ResultCache<R: RemoteTier> {
    cache: TieredCacheHandle<R>,
}

impl<R: RemoteTier> ResultCache<R> {
    pub fn new(cache: TieredCacheHandle<R>) -> Self {
        Self { cache }
    }

    /// Tag carried by every response a store contributed to.
    pub fn store_tag(store: &str) -> String {
        format!("store:{store}")
    }

    fn key(query: &str, k: usize, include_sources: bool) -> CacheKey {
        let k = k.to_string();
        CacheKey::new(
            NS_QUERY,
            query,
            &[
                ("k", &k),
                ("sources", if include_sources { "true" } else { "false" }),
            ],
        )
    }

    pub async fn get(&self, query: &str, k: usize, include_sources: bool) -> Option<RankedResponse> {
        match self.cache.get(&Self::key(query, k, include_sources)).await {
            Some(CacheValue::Json(payload)) => match serde_json::from_str(&payload) {
                Ok(response) => Some(response),
                Err(e) => {
                    warn!(error = %e, "discarding unparsable cached response");
                    None
                }
            },
            Some(_) => {
                warn!("cached response slot held a non-JSON value, ignoring");
                None
            }
            None => None,
        }
    }

    /// Stores a response, tagged with its contributing stores.
    pub async fn put(&self, query: &str, k: usize, include_sources: bool, response: &RankedResponse) {
        let payload = match serde_json::to_string(response) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize ranked response, not caching");
                return;
            }
        };
        let tags = response
            .stores_searched
            .iter()
            .map(|store| Self::store_tag(store))
            .collect();

        self.cache
            .set(
                &Self::key(query, k, include_sources),
                CacheValue::Json(payload),
                tags,
            )
            .await;
    }

    /// Drops every cached response the store contributed to. Returns
    /// the number of local entries removed.
    pub async fn invalidate_store(&self, store: &str) -> usize {
        self.cache.invalidate_tags(&[Self::store_tag(store)]).await
    }

    /// Drops every cached response.
    pub async fn clear(&self) -> usize {
        self.cache.clear_namespace(NS_QUERY).await
    }

    pub fn cache(&self) -> &TieredCacheHandle<R> {
        &self.cache
    }
}

impl<R: RemoteTier> std::fmt::Debug for ResultCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").finish()
    }
}

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::constants::DEFAULT_SIMILARITY_THRESHOLD;
use crate::index::SearchResult;

use super::types::{BoostConfig, RankedResult};

/// Merges per-store search results and applies boosted re-ranking.
#[derive(Debug, Clone)]
pub struct ResultRanker {
    /// Raw-score floor a candidate must reach to survive filtering.
    threshold: f32,
    boosts: BoostConfig,
}

impl Default for ResultRanker {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD, BoostConfig::default())
    }
}

impl ResultRanker {
    pub fn new(threshold: f32, boosts: BoostConfig) -> Self {
        Self { threshold, boosts }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn boosts(&self) -> &BoostConfig {
        &self.boosts
    }

    /// Flattens per-store results into one candidate list, tagging
    /// each candidate with its store and its rank within that store.
    /// Stores are visited in name order, so the merge is deterministic
    /// regardless of fan-out completion order.
    pub fn merge(&self, per_store: &BTreeMap<String, SearchResult>) -> Vec<RankedResult> {
        let mut candidates = Vec::new();
        for (store, result) in per_store {
            for (rank, ((id, score), metadata)) in result
                .ids
                .iter()
                .zip(&result.scores)
                .zip(&result.metadata)
                .enumerate()
            {
                candidates.push(RankedResult {
                    external_id: id.clone(),
                    store: store.clone(),
                    store_rank: rank,
                    original_score: *score,
                    boosted_score: 0.0,
                    metadata: metadata.clone(),
                });
            }
        }

        debug!(
            stores = per_store.len(),
            candidates = candidates.len(),
            "merged per-store results"
        );
        candidates
    }

    /// Filters by the similarity threshold, boosts, re-sorts, and
    /// truncates to `k`.
    ///
    /// When no candidate clears the threshold, the top `k` by raw
    /// score are kept instead of returning nothing; relevant-but-weak
    /// matches beat an empty answer. Ordering is boosted score
    /// descending, ties by raw score descending, then by store rank
    /// ascending so a store's own top hit wins over its later ones.
    pub fn rank(&self, mut candidates: Vec<RankedResult>, k: usize) -> Vec<RankedResult> {
        if candidates.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut pool: Vec<RankedResult> = candidates
            .iter()
            .filter(|c| c.original_score >= self.threshold)
            .cloned()
            .collect();

        if pool.is_empty() {
            info!(
                threshold = self.threshold,
                candidates = candidates.len(),
                "no candidate cleared the similarity threshold, keeping raw top-k"
            );
            candidates.sort_by(|a, b| b.original_score.total_cmp(&a.original_score));
            candidates.truncate(k);
            pool = candidates;
        }

        for candidate in &mut pool {
            candidate.boosted_score = candidate.original_score
                * self.boosts.store_multiplier(&candidate.store)
                * self.boosts.metadata_multiplier(&candidate.metadata);
        }

        pool.sort_by(|a, b| {
            b.boosted_score
                .total_cmp(&a.boosted_score)
                .then_with(|| b.original_score.total_cmp(&a.original_score))
                .then_with(|| a.store_rank.cmp(&b.store_rank))
        });
        pool.truncate(k);
        pool
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    META_SECTION, META_TIMESTAMP, META_TITLE, SECTION_BOOST, TIMESTAMP_BOOST, TITLE_BOOST,
};
use crate::index::MetadataMap;

/// Candidate in the merged cross-store ranking.
///
/// Built per query from the per-store results and discarded once the
/// response is assembled; only the serialized response payload
/// outlives the request, inside the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub external_id: String,
    /// Store that produced the candidate.
    pub store: String,
    /// 0-based position within that store's own result order.
    pub store_rank: usize,
    /// Raw similarity as the store reported it.
    pub original_score: f32,
    /// [`original_score`](RankedResult::original_score) after the store and
    /// metadata multipliers.
    pub boosted_score: f32,
    pub metadata: MetadataMap,
}

/// Multipliers applied during re-ranking.
///
/// Per-store multipliers come from configuration (a store without an
/// entry ranks at `1.0`); the metadata multiplier rewards candidates
/// that carry high-value fields.
#[derive(Debug, Clone, Default)]
pub struct BoostConfig {
    store_boosts: HashMap<String, f32>,
}

impl BoostConfig {
    pub fn new(store_boosts: HashMap<String, f32>) -> Self {
        Self { store_boosts }
    }

    pub fn with_store(mut self, store: impl Into<String>, boost: f32) -> Self {
        self.store_boosts.insert(store.into(), boost);
        self
    }

    /// Configured multiplier for a store, `1.0` when unlisted.
    pub fn store_multiplier(&self, store: &str) -> f32 {
        self.store_boosts.get(store).copied().unwrap_or(1.0)
    }

    /// `1.0` plus a fixed increment per high-value field the candidate
    /// carries: title, section, timestamp.
    pub fn metadata_multiplier(&self, metadata: &MetadataMap) -> f32 {
        let mut multiplier = 1.0;
        if metadata.contains_key(META_TITLE) {
            multiplier += TITLE_BOOST;
        }
        if metadata.contains_key(META_SECTION) {
            multiplier += SECTION_BOOST;
        }
        if metadata.contains_key(META_TIMESTAMP) {
            multiplier += TIMESTAMP_BOOST;
        }
        multiplier
    }
}

//! Exact and approximate nearest-neighbor structures.
//!
//! All variants store vectors in one row-major [`FlatStore`] of f16
//! values and score rows with the same f32-query cosine; they differ
//! only in which rows a query visits.

pub mod clustered;
pub mod exact;
pub mod graph;

use half::f16;

use super::config::{IndexConfig, IndexKind};
use super::error::IndexError;

pub use clustered::ClusteredIndex;
pub use exact::ExactIndex;
pub use graph::GraphIndex;

/// Row-major f16 vector storage.
#[derive(Debug, Clone)]
pub struct FlatStore {
    dimension: usize,
    data: Vec<f16>,
}

impl FlatStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Rebuilds a store from raw parts, validating the row geometry.
    pub fn from_parts(dimension: usize, data: Vec<f16>) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        if !data.len().is_multiple_of(dimension) {
            return Err(IndexError::MalformedVectorData {
                len: data.len(),
                dimension,
            });
        }
        Ok(Self { dimension, data })
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Appends a vector, quantizing to f16. Returns the new row id.
    pub fn push(&mut self, vector: &[f32]) -> u32 {
        let id = self.len() as u32;
        self.data.extend(vector.iter().map(|&v| f16::from_f32(v)));
        id
    }

    /// Stored row, or `None` when `id` is out of range.
    pub fn row(&self, id: u32) -> Option<&[f16]> {
        let start = id as usize * self.dimension;
        self.data.get(start..start + self.dimension)
    }

    /// Cosine similarity between a stored row and an f32 query.
    #[inline]
    pub fn score(&self, id: u32, query: &[f32]) -> f32 {
        self.row(id)
            .map_or(0.0, |row| cosine_similarity_f16_f32(row, query))
    }

    /// Raw row-major data, in storage order.
    pub fn raw(&self) -> &[f16] {
        &self.data
    }

    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f16>()
    }
}

/// Cosine similarity between a stored f16 row and an f32 query.
/// Returns 0.0 on length mismatch or a zero-norm side.
#[inline]
pub fn cosine_similarity_f16_f32(a: &[f16], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a_sq = 0.0f32;
    let mut norm_b_sq = 0.0f32;

    for (av_f16, &bv) in a.iter().zip(b.iter()) {
        let av = av_f16.to_f32();
        dot += av * bv;
        norm_a_sq += av * av;
        norm_b_sq += bv * bv;
    }

    let norm_a = norm_a_sq.sqrt();
    let norm_b = norm_b_sq.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Cosine similarity between two f32 vectors.
#[inline]
pub(crate) fn cosine_similarity_f32(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a_sq = 0.0f32;
    let mut norm_b_sq = 0.0f32;

    for (&av, &bv) in a.iter().zip(b.iter()) {
        dot += av * bv;
        norm_a_sq += av * av;
        norm_b_sq += bv * bv;
    }

    let norm_a = norm_a_sq.sqrt();
    let norm_b = norm_b_sq.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Scores candidate rows against the query, keeping the best `k` in a
/// bounded min-heap.
pub(crate) fn select_top_k(
    store: &FlatStore,
    candidates: impl Iterator<Item = u32>,
    query: &[f32],
    k: usize,
) -> Vec<Scored> {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    let mut heap = BinaryHeap::with_capacity(k.saturating_add(1));
    for id in candidates {
        let scored = Scored {
            id,
            score: store.score(id, query),
        };
        heap.push(Reverse(scored));
        if heap.len() > k {
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(scored)| scored)
        .collect()
}

/// Candidate row with its similarity. Ordered by score with the row id
/// as tiebreak, so heap selection is total and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub id: u32,
    pub score: f32,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score) == std::cmp::Ordering::Equal && self.id == other.id
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Search structure over a [`FlatStore`], selected per store.
#[derive(Debug)]
pub enum AnnIndex {
    Exact(ExactIndex),
    Clustered(ClusteredIndex),
    Graph(GraphIndex),
}

impl AnnIndex {
    /// Builds an empty index of the configured kind.
    pub fn new(config: &IndexConfig) -> Self {
        match config.kind {
            IndexKind::Exact => AnnIndex::Exact(ExactIndex::new(config.dimension)),
            IndexKind::Clustered => AnnIndex::Clustered(ClusteredIndex::new(
                config.dimension,
                config.cluster_probes,
            )),
            IndexKind::Graph => AnnIndex::Graph(GraphIndex::new(
                config.dimension,
                config.graph_search_breadth,
            )),
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            AnnIndex::Exact(_) => IndexKind::Exact,
            AnnIndex::Clustered(_) => IndexKind::Clustered,
            AnnIndex::Graph(_) => IndexKind::Graph,
        }
    }

    pub fn store(&self) -> &FlatStore {
        match self {
            AnnIndex::Exact(index) => index.store(),
            AnnIndex::Clustered(index) => index.store(),
            AnnIndex::Graph(index) => index.store(),
        }
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.store().dimension()
    }

    /// Adds a vector, returning its row id. Callers validate the
    /// dimension before pushing.
    pub fn add(&mut self, vector: &[f32]) -> u32 {
        match self {
            AnnIndex::Exact(index) => index.add(vector),
            AnnIndex::Clustered(index) => index.add(vector),
            AnnIndex::Graph(index) => index.add(vector),
        }
    }

    /// Finds the `k` most similar rows. Results come back sorted by
    /// descending score, ties by ascending row id; fewer than `k`
    /// entries when the index is smaller.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Scored> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }

        let mut results = match self {
            AnnIndex::Exact(index) => index.search(query, k),
            AnnIndex::Clustered(index) => index.search(query, k),
            AnnIndex::Graph(index) => index.search(query, k),
        };

        results.sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(k);
        results
    }

    /// Applies runtime tuning from `config` without touching the
    /// stored structure. Used after loading a snapshot.
    pub fn apply_tuning(&mut self, config: &IndexConfig) {
        match self {
            AnnIndex::Exact(_) => {}
            AnnIndex::Clustered(index) => index.set_probes(config.cluster_probes),
            AnnIndex::Graph(index) => index.set_breadth(config.graph_search_breadth),
        }
    }

    pub fn memory_bytes(&self) -> usize {
        self.store().memory_bytes()
    }
}

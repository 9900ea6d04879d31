//! Inverted-list index over k-means centroids.
//!
//! Vectors accumulate in the flat store until enough exist to cluster;
//! until then queries fall back to a full scan. Training is
//! deterministic: seeds are evenly spaced rows and Lloyd iterations
//! run a fixed count, so the same insert sequence always yields the
//! same lists.

use tracing::debug;

use super::{FlatStore, Scored, cosine_similarity_f32, select_top_k};
use crate::index::error::IndexError;
use crate::index::model::f16_to_f32_vec;

/// Number of centroids a training run produces.
const NLIST: usize = 16;
/// Training starts once this many vectors exist per prospective list.
const TRAIN_FACTOR: usize = 4;
/// Lloyd iterations per training run.
const KMEANS_ITERATIONS: usize = 10;

#[derive(Debug)]
pub struct ClusteredIndex {
    store: FlatStore,
    /// Lists probed per query.
    probes: usize,
    /// Row-major centroid matrix, `lists.len() x dimension`.
    centroids: Vec<f32>,
    /// Member rows per centroid.
    lists: Vec<Vec<u32>>,
    trained: bool,
}

impl ClusteredIndex {
    pub fn new(dimension: usize, probes: usize) -> Self {
        Self {
            store: FlatStore::new(dimension),
            probes: probes.max(1),
            centroids: Vec::new(),
            lists: Vec::new(),
            trained: false,
        }
    }

    /// Rebuilds an index from snapshot parts.
    pub fn from_parts(
        store: FlatStore,
        probes: usize,
        trained: bool,
        centroids: Vec<f32>,
        lists: Vec<Vec<u32>>,
    ) -> Result<Self, IndexError> {
        if trained {
            let dimension = store.dimension();
            if lists.is_empty() || centroids.len() != lists.len() * dimension {
                return Err(IndexError::SnapshotDecode {
                    reason: format!(
                        "centroid matrix has {} values for {} lists of dimension {}",
                        centroids.len(),
                        lists.len(),
                        dimension
                    ),
                });
            }
        }

        Ok(Self {
            store,
            probes: probes.max(1),
            centroids,
            lists,
            trained,
        })
    }

    pub fn store(&self) -> &FlatStore {
        &self.store
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn probes(&self) -> usize {
        self.probes
    }

    pub fn set_probes(&mut self, probes: usize) {
        self.probes = probes.max(1);
    }

    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    pub fn lists(&self) -> &[Vec<u32>] {
        &self.lists
    }

    pub fn add(&mut self, vector: &[f32]) -> u32 {
        let id = self.store.push(vector);

        if self.trained {
            let nearest = self.nearest_centroid(vector);
            self.lists[nearest].push(id);
        } else if self.store.len() >= NLIST * TRAIN_FACTOR {
            self.train();
        }

        id
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<Scored> {
        if k == 0 || self.store.is_empty() {
            return Vec::new();
        }

        if !self.trained {
            // Not enough data to cluster yet; scan everything.
            return select_top_k(&self.store, 0..self.store.len() as u32, query, k);
        }

        let dimension = self.store.dimension();
        let mut centroid_scores: Vec<(usize, f32)> = self
            .centroids
            .chunks_exact(dimension)
            .enumerate()
            .map(|(idx, centroid)| (idx, cosine_similarity_f32(centroid, query)))
            .collect();
        centroid_scores.sort_by(|a, b| b.1.total_cmp(&a.1));

        let probes = self.probes.min(self.lists.len());
        let candidates = centroid_scores
            .iter()
            .take(probes)
            .flat_map(|&(idx, _)| self.lists[idx].iter().copied());

        select_top_k(&self.store, candidates, query, k)
    }

    fn nearest_centroid(&self, vector: &[f32]) -> usize {
        let dimension = self.store.dimension();
        let mut best = 0;
        let mut best_score = f32::MIN;

        for (idx, centroid) in self.centroids.chunks_exact(dimension).enumerate() {
            let score = cosine_similarity_f32(centroid, vector);
            if score > best_score {
                best_score = score;
                best = idx;
            }
        }

        best
    }

    fn train(&mut self) {
        let len = self.store.len();
        let dimension = self.store.dimension();

        // f32 scratch copy of every row; training revisits them each
        // iteration.
        let rows: Vec<Vec<f32>> = (0..len)
            .filter_map(|i| self.store.row(i as u32))
            .map(f16_to_f32_vec)
            .collect();

        // Deterministic seeding from evenly spaced rows.
        let mut centroids: Vec<Vec<f32>> =
            (0..NLIST).map(|i| rows[i * len / NLIST].clone()).collect();

        let mut assignment = vec![0usize; len];

        for _ in 0..KMEANS_ITERATIONS {
            for (row_idx, row) in rows.iter().enumerate() {
                let mut best = 0usize;
                let mut best_score = f32::MIN;
                for (c_idx, centroid) in centroids.iter().enumerate() {
                    let score = cosine_similarity_f32(row, centroid);
                    if score > best_score {
                        best_score = score;
                        best = c_idx;
                    }
                }
                assignment[row_idx] = best;
            }

            // Move each centroid to the mean of its members; an empty
            // cluster keeps its previous position.
            let mut sums = vec![vec![0.0f32; dimension]; NLIST];
            let mut counts = vec![0usize; NLIST];
            for (row_idx, row) in rows.iter().enumerate() {
                let c = assignment[row_idx];
                counts[c] += 1;
                for (sum, value) in sums[c].iter_mut().zip(row) {
                    *sum += value;
                }
            }
            for (c_idx, centroid) in centroids.iter_mut().enumerate() {
                if counts[c_idx] > 0 {
                    for (dst, sum) in centroid.iter_mut().zip(&sums[c_idx]) {
                        *dst = sum / counts[c_idx] as f32;
                    }
                }
            }
        }

        let mut lists = vec![Vec::new(); NLIST];
        for (row_idx, &c) in assignment.iter().enumerate() {
            lists[c].push(row_idx as u32);
        }

        self.centroids = centroids.into_iter().flatten().collect();
        self.lists = lists;
        self.trained = true;

        debug!(vectors = len, clusters = NLIST, "clustered index trained");
    }
}

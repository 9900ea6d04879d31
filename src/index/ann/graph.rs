//! Navigable-small-world graph index.
//!
//! A single-layer proximity graph: every insertion beam-searches for
//! its nearest existing nodes and links to them bidirectionally, with
//! each node's neighbor list pruned to a bounded degree. Queries walk
//! the graph best-first from a fixed entry node. Construction is
//! deterministic given insertion order, so save/load reproduces the
//! same adjacency.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::{FlatStore, Scored, cosine_similarity_f16_f32};
use crate::index::error::IndexError;
use crate::index::model::f16_to_f32_vec;

/// Maximum neighbors a node keeps. Excess links are pruned to the
/// highest-similarity ones.
const MAX_DEGREE: usize = 16;

/// Beam width used while inserting, independent of the query-time
/// breadth so tuning searches does not change the graph shape.
const BUILD_BREADTH: usize = 32;

#[derive(Debug)]
pub struct GraphIndex {
    store: FlatStore,
    /// Beam width per query.
    breadth: usize,
    /// Adjacency lists, one per row.
    neighbors: Vec<Vec<u32>>,
}

impl GraphIndex {
    pub fn new(dimension: usize, breadth: usize) -> Self {
        Self {
            store: FlatStore::new(dimension),
            breadth: breadth.max(1),
            neighbors: Vec::new(),
        }
    }

    /// Rebuilds an index from snapshot parts.
    pub fn from_parts(
        store: FlatStore,
        breadth: usize,
        neighbors: Vec<Vec<u32>>,
    ) -> Result<Self, IndexError> {
        let len = store.len();
        if neighbors.len() != len {
            return Err(IndexError::SnapshotDecode {
                reason: format!(
                    "adjacency has {} lists for {} vectors",
                    neighbors.len(),
                    len
                ),
            });
        }
        if let Some(bad) = neighbors
            .iter()
            .flatten()
            .find(|&&id| id as usize >= len)
        {
            return Err(IndexError::SnapshotDecode {
                reason: format!("adjacency references row {bad} beyond {len} vectors"),
            });
        }

        Ok(Self {
            store,
            breadth: breadth.max(1),
            neighbors,
        })
    }

    pub fn store(&self) -> &FlatStore {
        &self.store
    }

    pub fn breadth(&self) -> usize {
        self.breadth
    }

    pub fn set_breadth(&mut self, breadth: usize) {
        self.breadth = breadth.max(1);
    }

    pub fn neighbors(&self) -> &[Vec<u32>] {
        &self.neighbors
    }

    pub fn add(&mut self, vector: &[f32]) -> u32 {
        let id = self.store.push(vector);
        self.neighbors.push(Vec::new());

        if id == 0 {
            return id;
        }

        // Wide beam during construction keeps the graph navigable even
        // when the query-time breadth is later tuned down.
        let nearest = self.beam_search(vector, MAX_DEGREE, BUILD_BREADTH, Some(id));
        for scored in nearest {
            self.link(id, scored.id);
            self.link(scored.id, id);
        }

        id
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<Scored> {
        if k == 0 || self.store.is_empty() {
            return Vec::new();
        }
        let breadth = self.breadth.max(k);
        self.beam_search(query, k, breadth, None)
    }

    /// Best-first walk from row 0. Keeps a frontier of unexpanded nodes
    /// ordered by score and a bounded result set of the best `ef` seen;
    /// stops when the best frontier node cannot improve the results.
    /// `exclude` skips one row, used to keep a node out of its own
    /// insertion search.
    fn beam_search(&self, query: &[f32], k: usize, ef: usize, exclude: Option<u32>) -> Vec<Scored> {
        let len = self.store.len();
        let ef = ef.max(k);

        let entry = match exclude {
            // Row 0 is always the entry unless it is the excluded row.
            Some(0) if len > 1 => 1,
            Some(0) => return Vec::new(),
            _ => 0,
        };

        let mut visited = vec![false; len];
        visited[entry as usize] = true;
        if let Some(excluded) = exclude {
            visited[excluded as usize] = true;
        }

        let entry_scored = Scored {
            id: entry,
            score: self.store.score(entry, query),
        };

        // Frontier is a max-heap of unexpanded nodes; results a
        // min-heap holding the best `ef` so far.
        let mut frontier = BinaryHeap::from([entry_scored]);
        let mut results: BinaryHeap<Reverse<Scored>> = BinaryHeap::from([Reverse(entry_scored)]);

        while let Some(current) = frontier.pop() {
            let worst = results
                .peek()
                .map(|Reverse(scored)| scored.score)
                .unwrap_or(f32::MIN);
            if results.len() >= ef && current.score < worst {
                break;
            }

            for &neighbor in &self.neighbors[current.id as usize] {
                if std::mem::replace(&mut visited[neighbor as usize], true) {
                    continue;
                }

                let scored = Scored {
                    id: neighbor,
                    score: self.store.score(neighbor, query),
                };

                let worst = results
                    .peek()
                    .map(|Reverse(s)| s.score)
                    .unwrap_or(f32::MIN);
                if results.len() < ef || scored.score > worst {
                    frontier.push(scored);
                    results.push(Reverse(scored));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut selected: Vec<Scored> = results.into_iter().map(|Reverse(s)| s).collect();
        selected.sort_unstable_by(|a, b| b.cmp(a));
        selected.truncate(k);
        selected
    }

    /// Adds `to` to `from`'s neighbor list, pruning back to
    /// [`MAX_DEGREE`] by similarity to `from`'s own vector.
    fn link(&mut self, from: u32, to: u32) {
        let list = &mut self.neighbors[from as usize];
        if list.contains(&to) {
            return;
        }
        list.push(to);

        if list.len() <= MAX_DEGREE {
            return;
        }

        let anchor = self
            .store
            .row(from)
            .map(f16_to_f32_vec)
            .unwrap_or_default();
        let mut ranked: Vec<Scored> = list
            .iter()
            .map(|&id| Scored {
                id,
                score: self
                    .store
                    .row(id)
                    .map_or(0.0, |row| cosine_similarity_f16_f32(row, &anchor)),
            })
            .collect();
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        ranked.truncate(MAX_DEGREE);

        *list = ranked.into_iter().map(|scored| scored.id).collect();
    }
}

//! Brute-force index: every query scores every row.

use super::{FlatStore, Scored, select_top_k};

#[derive(Debug)]
pub struct ExactIndex {
    store: FlatStore,
}

impl ExactIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            store: FlatStore::new(dimension),
        }
    }

    pub fn from_store(store: FlatStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FlatStore {
        &self.store
    }

    pub fn add(&mut self, vector: &[f32]) -> u32 {
        self.store.push(vector)
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<Scored> {
        if k == 0 || self.store.is_empty() {
            return Vec::new();
        }
        select_top_k(&self.store, 0..self.store.len() as u32, query, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> ExactIndex {
        let mut index = ExactIndex::new(3);
        index.add(&[1.0, 0.0, 0.0]);
        index.add(&[0.0, 1.0, 0.0]);
        index.add(&[0.0, 0.0, 1.0]);
        index.add(&[0.7, 0.7, 0.0]);
        index
    }

    #[test]
    fn test_top_1_is_best_match() {
        let index = sample_index();
        let results = index.search(&[1.0, 0.0, 0.0], 1);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 0);
        assert!((results[0].score - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_results_sorted_descending() {
        let index = sample_index();
        let results = index.search(&[1.0, 0.1, 0.0], 4);

        assert_eq!(results.len(), 4);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].id, 0);
    }

    #[test]
    fn test_k_beyond_len_returns_all() {
        let index = sample_index();
        let results = index.search(&[1.0, 0.0, 0.0], 100);
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_empty_index() {
        let index = ExactIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5).is_empty());
    }
}

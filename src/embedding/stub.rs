//! Deterministic embedder for tests and offline runs.

use std::hash::{DefaultHasher, Hash, Hasher};

use tracing::debug;

use super::{Embedder, EmbeddingError};

/// Hash-seeded embedder producing stable unit vectors.
///
/// The same text always maps to the same vector, so ranking behavior
/// can be pinned in tests without a provider. Vectors carry no
/// semantic signal; near-duplicate texts land far apart.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let value = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            embedding.push(value);
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }

        embedding
    }
}

impl Embedder for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(batch = texts.len(), "generating stub embeddings");
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

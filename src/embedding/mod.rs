//! Text embedding: provider client, deterministic stub, and the
//! cache-backed wrapper shared by the index and orchestrator layers.

/// Cache-backed embedding front.
pub mod cache;
mod error;
/// OpenAI-compatible embeddings endpoint client.
pub mod http;
/// Deterministic offline embedder.
pub mod stub;

pub use cache::{EmbeddingCache, EmbeddingCacheHandle};
pub use error::EmbeddingError;
pub use http::HttpEmbedder;
pub use stub::StubEmbedder;

/// Embedding backend.
///
/// `embed_many` returns one vector per input, in input order; an empty
/// input yields an empty result without a provider call. Every vector
/// has exactly [`Embedder::dimension`] components.
pub trait Embedder: Send + Sync + 'static {
    /// Output dimension of every returned vector.
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts in order.
    fn embed_many(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;
}

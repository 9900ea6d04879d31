use std::path::PathBuf;

use thiserror::Error;

use crate::embedding::EmbeddingError;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("store name must not be empty")]
    EmptyName,

    #[error("embedding dimension must be non-zero")]
    ZeroDimension,

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("invalid metadata filter: {reason}")]
    InvalidFilter { reason: String },

    #[error("snapshot encode failed: {reason}")]
    SnapshotEncode { reason: String },

    #[error("snapshot decode failed: {reason}")]
    SnapshotDecode { reason: String },

    #[error("sidecar not found at {path}")]
    SidecarMissing { path: PathBuf },

    #[error("sidecar parse failed: {reason}")]
    SidecarParse { reason: String },

    #[error("snapshot/sidecar dimension mismatch: snapshot {snapshot}, sidecar {sidecar}")]
    SidecarDimensionMismatch { snapshot: usize, sidecar: usize },

    #[error("snapshot/sidecar count mismatch: snapshot {snapshot} vectors, sidecar {sidecar} entries")]
    SidecarCountMismatch { snapshot: usize, sidecar: usize },

    #[error("vector data length {len} is not a multiple of dimension {dimension}")]
    MalformedVectorData { len: usize, dimension: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal task failed: {reason}")]
    Internal { reason: String },
}

pub type IndexResult<T> = Result<T, IndexError>;

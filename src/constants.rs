//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants (e.g. byte sizes) from primary ones to avoid drift.
//!
//! # Dimension Invariants
//!
//! The embedding dimension is treated as an invariant across many modules (embedding,
//! index, cache, scoring). Dimensions are configurable at runtime:
//!
//! 1. Use [`DimConfig`] to pass dimensions through initialization
//! 2. Use [`validate_embedding_dim`] at module boundaries to catch mismatches early
//! 3. The constants below remain as defaults and for static size calculations

pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const EMBEDDING_F16_BYTES: usize = DEFAULT_EMBEDDING_DIM * 2;
pub const EMBEDDING_F32_BYTES: usize = DEFAULT_EMBEDDING_DIM * 4;

/// Minimum cosine similarity a candidate must reach to survive result filtering.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.70;

/// Maximum number of entries held by the local cache tier.
pub const DEFAULT_LOCAL_CAPACITY: usize = 10_000;

/// Remote cache frames larger than this are gzip-compressed (kept only when
/// strictly smaller than the raw frame).
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;

/// Interval between background sweeps that purge expired local entries.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Fraction of the local tier evicted in one batch when capacity is reached.
/// At least one entry is always evicted.
pub const EVICTION_FRACTION: f64 = 0.20;

/// Candidate over-fetch multiplier applied before metadata filtering: a search
/// for `k` results pulls `k * OVERFETCH_FACTOR` candidates from the index.
pub const OVERFETCH_FACTOR: usize = 2;

pub const DEFAULT_MAX_TOP_K: usize = 100;

/// Probe count for the clustered index (inverted lists visited per search).
pub const DEFAULT_CLUSTER_PROBES: usize = 8;

/// Beam width for the graph index search.
pub const DEFAULT_GRAPH_SEARCH_BREADTH: usize = 50;

pub const DEFAULT_QUERY_TTL_SECS: u64 = 3600;
pub const DEFAULT_EMBEDDING_TTL_SECS: u64 = 86_400;

/// Cache namespace for ranked query responses.
pub const NS_QUERY: &str = "query";
/// Cache namespace for text embeddings.
pub const NS_EMBEDDING: &str = "embedding";

/// Metadata fields that raise a result's quality multiplier when present.
pub const META_TITLE: &str = "title";
pub const META_SECTION: &str = "section";
pub const META_TIMESTAMP: &str = "timestamp";

/// Additive quality increments per present metadata field. The multiplier for a
/// result is `1.0 + sum(increments of present fields)`.
pub const TITLE_BOOST: f32 = 0.03;
pub const SECTION_BOOST: f32 = 0.02;
pub const TIMESTAMP_BOOST: f32 = 0.01;

/// Runtime dimension configuration for modules that support dynamic embedding sizes.
///
/// Use this when initializing modules that need to agree on vector dimensions at runtime.
/// The [`validate`](DimConfig::validate) method catches unusable configurations early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    /// Creates a new dimension configuration with the specified embedding dimension.
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    /// Validates that this configuration is usable.
    ///
    /// Returns an error if `embedding_dim` is zero.
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.embedding_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        Ok(())
    }

    /// Returns the number of bytes needed for F16 representation.
    pub fn f16_bytes(&self) -> usize {
        self.embedding_dim * 2
    }

    /// Returns the number of bytes needed for F32 representation.
    pub fn f32_bytes(&self) -> usize {
        self.embedding_dim * 4
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// Use this at module boundaries to catch dimension mismatches early, rather than
/// encountering silent data corruption or panics deep in the processing pipeline.
///
/// # Example
///
/// ```
/// use sift::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// // At module boundary, validate incoming dimension matches expected
/// let embedder_dim = 384;
/// validate_embedding_dim(embedder_dim, DEFAULT_EMBEDDING_DIM).unwrap();
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

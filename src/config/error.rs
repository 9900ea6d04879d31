//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Index kind string did not name a known index implementation.
    #[error("unknown index kind '{value}': expected 'exact', 'clustered' or 'graph'")]
    InvalidIndexKind { value: String },

    /// Similarity threshold string could not be parsed as a float.
    #[error("failed to parse similarity threshold '{value}': {source}")]
    ThresholdParseError {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// Similarity threshold is outside the usable range.
    #[error("invalid similarity threshold {value}: must be in (0, 1]")]
    InvalidThreshold { value: f32 },

    /// An entry in a `name=value` list variable could not be parsed.
    #[error("malformed entry '{entry}' in {name}: expected 'name=value'")]
    InvalidMapEntry { name: &'static str, entry: String },

    /// A per-store boost multiplier must be positive.
    #[error("invalid boost {value} for store '{store}': must be > 0")]
    InvalidStoreBoost { store: String, value: f32 },

    /// A numeric setting that must be positive was zero.
    #[error("{name} must be greater than zero")]
    ZeroValue { name: &'static str },

    /// The remote key prefix cannot be empty.
    #[error("remote key prefix must not be empty")]
    EmptyKeyPrefix,
}

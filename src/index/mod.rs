//! Vector store indexes: search structures, metadata filtering, and
//! snapshot persistence.

pub mod ann;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod vector_index;

mod persist;

pub use ann::{AnnIndex, ClusteredIndex, ExactIndex, FlatStore, GraphIndex, Scored};
pub use config::{IndexConfig, IndexKind, UnknownIndexKind};
pub use error::{IndexError, IndexResult};
pub use filter::{FilterCondition, MetadataFilter};
pub use model::{
    IndexStats, MetaValue, MetadataMap, SearchResult, VectorRecord, bits_to_f16_vec,
    f16_slice_to_bits, f16_to_f32_vec, f32_to_f16_vec,
};
pub use vector_index::{VectorIndex, VectorIndexHandle};

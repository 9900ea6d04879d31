//! Data model shared by the store indexes and the orchestrator.

use std::collections::BTreeMap;

use half::f16;
use serde::{Deserialize, Serialize};

use super::config::IndexKind;

/// Metadata value attached to a document.
///
/// Untagged: JSON numbers become `Int` when integral and `Float`
/// otherwise; variant order decides the ambiguous cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<MetaValue>),
}

impl MetaValue {
    /// Numeric view used by range filters.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Int(v) => Some(*v as f64),
            MetaValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}

/// Per-document metadata.
pub type MetadataMap = BTreeMap<String, MetaValue>;

/// One document handed to a store for indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub external_id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: MetadataMap,
}

impl VectorRecord {
    pub fn new(external_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            text: text.into(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Output of one store search, parallel arrays ordered by descending
/// score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub ids: Vec<String>,
    pub scores: Vec<f32>,
    pub metadata: Vec<MetadataMap>,
    pub search_time_ms: f64,
    /// Matches surviving the filter, counted before truncation to `k`.
    pub total_results: usize,
    pub index_name: String,
    pub cache_hit: bool,
}

impl SearchResult {
    pub fn empty(index_name: impl Into<String>) -> Self {
        Self {
            ids: Vec::new(),
            scores: Vec::new(),
            metadata: Vec::new(),
            search_time_ms: 0.0,
            total_results: 0,
            index_name: index_name.into(),
            cache_hit: false,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Point-in-time description of a store index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub name: String,
    pub kind: IndexKind,
    pub vectors: usize,
    pub dimension: usize,
    pub memory_bytes: usize,
}

/// Converts f32 values to their f16 storage form.
pub fn f32_to_f16_vec(values: &[f32]) -> Vec<f16> {
    values.iter().map(|&v| f16::from_f32(v)).collect()
}

/// Converts stored f16 values back to f32.
pub fn f16_to_f32_vec(values: &[f16]) -> Vec<f32> {
    values.iter().map(|v| v.to_f32()).collect()
}

/// Reinterprets f16 values as their raw bit pattern for serialization.
pub fn f16_slice_to_bits(values: &[f16]) -> Vec<u16> {
    bytemuck::cast_slice(values).to_vec()
}

/// Rebuilds f16 values from their raw bit pattern.
pub fn bits_to_f16_vec(bits: &[u16]) -> Vec<f16> {
    bytemuck::cast_slice(bits).to_vec()
}

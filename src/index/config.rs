use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_CLUSTER_PROBES, DEFAULT_EMBEDDING_DIM, DEFAULT_GRAPH_SEARCH_BREADTH,
    DEFAULT_MAX_TOP_K,
};

/// Search structure backing a store's vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Brute-force scan over every vector.
    Exact,
    /// Inverted lists around k-means centroids, probed nearest-first.
    Clustered,
    /// Navigable small-world graph walked best-first.
    Graph,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Exact => "exact",
            IndexKind::Clustered => "clustered",
            IndexKind::Graph => "graph",
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown index kind: {0}, expected one of exact, clustered, graph")]
pub struct UnknownIndexKind(pub String);

impl std::str::FromStr for IndexKind {
    type Err = UnknownIndexKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(IndexKind::Exact),
            "clustered" => Ok(IndexKind::Clustered),
            "graph" => Ok(IndexKind::Graph),
            _ => Err(UnknownIndexKind(s.to_string())),
        }
    }
}

/// Tuning for one store index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub kind: IndexKind,
    /// Dimension every stored and query vector must have.
    pub dimension: usize,
    /// Clusters probed per query when `kind` is clustered.
    pub cluster_probes: usize,
    /// Beam width per query when `kind` is graph.
    pub graph_search_breadth: usize,
    /// Upper bound applied to requested `k`.
    pub max_top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            kind: IndexKind::Exact,
            dimension: DEFAULT_EMBEDDING_DIM,
            cluster_probes: DEFAULT_CLUSTER_PROBES,
            graph_search_breadth: DEFAULT_GRAPH_SEARCH_BREADTH,
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

impl IndexConfig {
    pub fn with_kind(kind: IndexKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("exact".parse::<IndexKind>().unwrap(), IndexKind::Exact);
        assert_eq!(
            " Clustered ".parse::<IndexKind>().unwrap(),
            IndexKind::Clustered
        );
        assert_eq!("GRAPH".parse::<IndexKind>().unwrap(), IndexKind::Graph);
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "hnsw".parse::<IndexKind>().unwrap_err();
        assert_eq!(err, UnknownIndexKind("hnsw".to_string()));
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&IndexKind::Clustered).unwrap(),
            "\"clustered\""
        );
        let parsed: IndexKind = serde_json::from_str("\"graph\"").unwrap();
        assert_eq!(parsed, IndexKind::Graph);
    }

    #[test]
    fn test_display_round_trip() {
        for kind in [IndexKind::Exact, IndexKind::Clustered, IndexKind::Graph] {
            assert_eq!(kind.to_string().parse::<IndexKind>().unwrap(), kind);
        }
    }
}

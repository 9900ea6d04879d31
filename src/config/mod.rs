//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `SIFT_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::constants::{
    DEFAULT_CLUSTER_PROBES, DEFAULT_COMPRESSION_THRESHOLD, DEFAULT_EMBEDDING_DIM,
    DEFAULT_EMBEDDING_TTL_SECS, DEFAULT_GRAPH_SEARCH_BREADTH, DEFAULT_LOCAL_CAPACITY,
    DEFAULT_MAX_TOP_K, DEFAULT_QUERY_TTL_SECS, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_SWEEP_INTERVAL_SECS, DimConfig, NS_EMBEDDING, NS_QUERY,
};
use crate::index::{IndexConfig, IndexKind};
use crate::orchestrator::OrchestratorConfig;
use crate::scoring::BoostConfig;

/// Engine configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `SIFT_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Index implementation used for new stores. Default: `exact`.
    pub index_kind: IndexKind,

    /// Inverted lists probed per clustered-index search. Default: `8`.
    pub cluster_probes: usize,

    /// Beam width for graph-index searches. Default: `50`.
    pub graph_search_breadth: usize,

    /// Embedding vector dimension. Default: `384`.
    pub embedding_dim: usize,

    /// Max entries in the local cache tier. Default: `10_000`.
    pub local_capacity: usize,

    /// Local TTLs in seconds, per namespace. Defaults: `query=3600`, `embedding=86400`.
    pub namespace_ttls: HashMap<String, u64>,

    /// Remote TTLs in seconds, per namespace. Defaults match [`Config::namespace_ttls`].
    pub remote_ttls: HashMap<String, u64>,

    /// Remote frames above this many bytes are gzip-compressed. Default: `1024`.
    pub compression_threshold: usize,

    /// Seconds between background sweeps of expired local entries. Default: `300`.
    pub sweep_interval_secs: u64,

    /// Minimum similarity score for ranked results. Default: `0.7`.
    pub similarity_threshold: f32,

    /// Per-store score multipliers, e.g. `plans=1.1`. Unlisted stores use `1.0`.
    pub store_boosts: HashMap<String, f32>,

    /// Upper bound on requested result counts. Default: `100`.
    pub max_top_k: usize,

    /// Redis endpoint URL. `None` runs the cache local-only.
    pub redis_url: Option<String>,

    /// Prefix for remote cache keys. Default: `sift`.
    pub key_prefix: String,

    /// Embedding service base URL. `None` selects the deterministic stub embedder.
    pub embedding_url: Option<String>,

    /// Embedding model name sent to the service. Default: `text-embedding-3-small`.
    pub embedding_model: String,

    /// Bearer token for the embedding service, if it requires one.
    pub embedding_api_key: Option<String>,
}

/// Default embedding model used when `SIFT_EMBEDDING_MODEL` is not set.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default remote key prefix used when `SIFT_KEY_PREFIX` is not set.
pub const DEFAULT_KEY_PREFIX: &str = "sift";

impl Default for Config {
    fn default() -> Self {
        Self {
            index_kind: IndexKind::Exact,
            cluster_probes: DEFAULT_CLUSTER_PROBES,
            graph_search_breadth: DEFAULT_GRAPH_SEARCH_BREADTH,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            local_capacity: DEFAULT_LOCAL_CAPACITY,
            namespace_ttls: default_namespace_ttls(),
            remote_ttls: default_namespace_ttls(),
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            store_boosts: HashMap::new(),
            max_top_k: DEFAULT_MAX_TOP_K,
            redis_url: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            embedding_url: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_api_key: None,
        }
    }
}

fn default_namespace_ttls() -> HashMap<String, u64> {
    HashMap::from([
        (NS_QUERY.to_string(), DEFAULT_QUERY_TTL_SECS),
        (NS_EMBEDDING.to_string(), DEFAULT_EMBEDDING_TTL_SECS),
    ])
}

impl Config {
    const ENV_INDEX_KIND: &'static str = "SIFT_INDEX_KIND";
    const ENV_CLUSTER_PROBES: &'static str = "SIFT_CLUSTER_PROBES";
    const ENV_GRAPH_SEARCH_BREADTH: &'static str = "SIFT_GRAPH_SEARCH_BREADTH";
    const ENV_EMBEDDING_DIM: &'static str = "SIFT_EMBEDDING_DIM";
    const ENV_LOCAL_CAPACITY: &'static str = "SIFT_LOCAL_CAPACITY";
    const ENV_NAMESPACE_TTLS: &'static str = "SIFT_NAMESPACE_TTLS";
    const ENV_REMOTE_TTLS: &'static str = "SIFT_REMOTE_TTLS";
    const ENV_COMPRESSION_THRESHOLD: &'static str = "SIFT_COMPRESSION_THRESHOLD";
    const ENV_SWEEP_INTERVAL_SECS: &'static str = "SIFT_SWEEP_INTERVAL_SECS";
    const ENV_SIMILARITY_THRESHOLD: &'static str = "SIFT_SIMILARITY_THRESHOLD";
    const ENV_STORE_BOOSTS: &'static str = "SIFT_STORE_BOOSTS";
    const ENV_MAX_TOP_K: &'static str = "SIFT_MAX_TOP_K";
    const ENV_REDIS_URL: &'static str = "SIFT_REDIS_URL";
    const ENV_KEY_PREFIX: &'static str = "SIFT_KEY_PREFIX";
    const ENV_EMBEDDING_URL: &'static str = "SIFT_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "SIFT_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "SIFT_EMBEDDING_API_KEY";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let index_kind = Self::parse_index_kind_from_env(defaults.index_kind)?;
        let cluster_probes =
            Self::parse_usize_from_env(Self::ENV_CLUSTER_PROBES, defaults.cluster_probes);
        let graph_search_breadth = Self::parse_usize_from_env(
            Self::ENV_GRAPH_SEARCH_BREADTH,
            defaults.graph_search_breadth,
        );
        let embedding_dim =
            Self::parse_usize_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim);
        let local_capacity =
            Self::parse_usize_from_env(Self::ENV_LOCAL_CAPACITY, defaults.local_capacity);
        let namespace_ttls =
            Self::parse_u64_map_from_env(Self::ENV_NAMESPACE_TTLS, defaults.namespace_ttls)?;
        let remote_ttls = Self::parse_u64_map_from_env(Self::ENV_REMOTE_TTLS, defaults.remote_ttls)?;
        let compression_threshold = Self::parse_usize_from_env(
            Self::ENV_COMPRESSION_THRESHOLD,
            defaults.compression_threshold,
        );
        let sweep_interval_secs =
            Self::parse_u64_from_env(Self::ENV_SWEEP_INTERVAL_SECS, defaults.sweep_interval_secs);
        let similarity_threshold =
            Self::parse_threshold_from_env(defaults.similarity_threshold)?;
        let store_boosts =
            Self::parse_f32_map_from_env(Self::ENV_STORE_BOOSTS, defaults.store_boosts)?;
        let max_top_k = Self::parse_usize_from_env(Self::ENV_MAX_TOP_K, defaults.max_top_k);
        let redis_url = Self::parse_optional_string_from_env(Self::ENV_REDIS_URL);
        let key_prefix = Self::parse_string_from_env(Self::ENV_KEY_PREFIX, defaults.key_prefix);
        let embedding_url = Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_URL);
        let embedding_model =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_MODEL, defaults.embedding_model);
        let embedding_api_key = Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_API_KEY);

        Ok(Self {
            index_kind,
            cluster_probes,
            graph_search_breadth,
            embedding_dim,
            local_capacity,
            namespace_ttls,
            remote_ttls,
            compression_threshold,
            sweep_interval_secs,
            similarity_threshold,
            store_boosts,
            max_top_k,
            redis_url,
            key_prefix,
            embedding_url,
            embedding_model,
            embedding_api_key,
        })
    }

    /// Validates ranges and basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if DimConfig::new(self.embedding_dim).validate().is_err() {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_EMBEDDING_DIM,
            });
        }
        if self.local_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_LOCAL_CAPACITY,
            });
        }
        if self.max_top_k == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_MAX_TOP_K,
            });
        }
        if self.cluster_probes == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_CLUSTER_PROBES,
            });
        }
        if self.graph_search_breadth == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_GRAPH_SEARCH_BREADTH,
            });
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::InvalidThreshold {
                value: self.similarity_threshold,
            });
        }
        for (store, boost) in &self.store_boosts {
            if *boost <= 0.0 {
                return Err(ConfigError::InvalidStoreBoost {
                    store: store.clone(),
                    value: *boost,
                });
            }
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::EmptyKeyPrefix);
        }

        Ok(())
    }

    /// Builds the cache-module configuration derived from this config.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.local_capacity,
            local_ttls: self.namespace_ttls.clone(),
            remote_ttls: self.remote_ttls.clone(),
            compression_threshold: self.compression_threshold,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            key_prefix: self.key_prefix.clone(),
        }
    }

    /// Builds the index-module configuration derived from this config.
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            kind: self.index_kind,
            dimension: self.embedding_dim,
            cluster_probes: self.cluster_probes,
            graph_search_breadth: self.graph_search_breadth,
            max_top_k: self.max_top_k,
        }
    }

    /// Builds the scoring boost configuration derived from this config.
    pub fn boost_config(&self) -> BoostConfig {
        BoostConfig::new(self.store_boosts.clone())
    }

    /// Builds the orchestrator configuration derived from this config.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            similarity_threshold: self.similarity_threshold,
            max_top_k: self.max_top_k,
        }
    }

    fn parse_index_kind_from_env(default: IndexKind) -> Result<IndexKind, ConfigError> {
        match env::var(Self::ENV_INDEX_KIND) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidIndexKind { value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_threshold_from_env(default: f32) -> Result<f32, ConfigError> {
        match env::var(Self::ENV_SIMILARITY_THRESHOLD) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::ThresholdParseError { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_u64_map_from_env(
        var_name: &'static str,
        defaults: HashMap<String, u64>,
    ) -> Result<HashMap<String, u64>, ConfigError> {
        let mut map = defaults;
        for (name, value) in Self::parse_map_entries_from_env(var_name)? {
            let parsed = value
                .parse()
                .map_err(|_| ConfigError::InvalidMapEntry {
                    name: var_name,
                    entry: format!("{name}={value}"),
                })?;
            map.insert(name, parsed);
        }
        Ok(map)
    }

    fn parse_f32_map_from_env(
        var_name: &'static str,
        defaults: HashMap<String, f32>,
    ) -> Result<HashMap<String, f32>, ConfigError> {
        let mut map = defaults;
        for (name, value) in Self::parse_map_entries_from_env(var_name)? {
            let parsed = value
                .parse()
                .map_err(|_| ConfigError::InvalidMapEntry {
                    name: var_name,
                    entry: format!("{name}={value}"),
                })?;
            map.insert(name, parsed);
        }
        Ok(map)
    }

    /// Splits a `name=value,name=value` variable into pairs. Entries merge over
    /// defaults rather than replacing the whole map.
    fn parse_map_entries_from_env(
        var_name: &'static str,
    ) -> Result<Vec<(String, String)>, ConfigError> {
        let Ok(raw) = env::var(var_name) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((name, value)) = part.split_once('=') else {
                return Err(ConfigError::InvalidMapEntry {
                    name: var_name,
                    entry: part.to_string(),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidMapEntry {
                    name: var_name,
                    entry: part.to_string(),
                });
            }
            entries.push((name.to_string(), value.trim().to_string()));
        }
        Ok(entries)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_usize_from_env(var_name: &str, default: usize) -> usize {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

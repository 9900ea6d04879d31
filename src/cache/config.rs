//! Cache module configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::constants::{
    DEFAULT_COMPRESSION_THRESHOLD, DEFAULT_EMBEDDING_TTL_SECS, DEFAULT_LOCAL_CAPACITY,
    DEFAULT_QUERY_TTL_SECS, DEFAULT_SWEEP_INTERVAL_SECS, NS_EMBEDDING, NS_QUERY,
};

/// Settings for the tiered cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Max entries in the local tier.
    pub capacity: usize,

    /// Local TTLs in seconds, per namespace. A namespace without an entry has
    /// no default TTL: its entries live until evicted.
    pub local_ttls: HashMap<String, u64>,

    /// Remote TTLs in seconds, per namespace.
    pub remote_ttls: HashMap<String, u64>,

    /// Frames above this many bytes are gzip-compressed before the remote write.
    pub compression_threshold: usize,

    /// Interval between background sweeps of expired local entries.
    pub sweep_interval: Duration,

    /// Prefix for remote storage keys.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOCAL_CAPACITY,
            local_ttls: default_namespace_ttls(),
            remote_ttls: default_namespace_ttls(),
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            key_prefix: "sift".to_string(),
        }
    }
}

impl CacheConfig {
    /// Default local TTL for a namespace, if one is configured.
    pub fn local_ttl(&self, namespace: &str) -> Option<Duration> {
        self.local_ttls
            .get(namespace)
            .copied()
            .map(Duration::from_secs)
    }

    /// Default remote TTL for a namespace, if one is configured.
    pub fn remote_ttl(&self, namespace: &str) -> Option<Duration> {
        self.remote_ttls
            .get(namespace)
            .copied()
            .map(Duration::from_secs)
    }
}

pub(crate) fn default_namespace_ttls() -> HashMap<String, u64> {
    HashMap::from([
        (NS_QUERY.to_string(), DEFAULT_QUERY_TTL_SECS),
        (NS_EMBEDDING.to_string(), DEFAULT_EMBEDDING_TTL_SECS),
    ])
}

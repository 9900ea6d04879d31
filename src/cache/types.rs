//! Core cache data types.

use std::time::{Duration, Instant};

use rkyv::{Archive, Deserialize, Serialize};

use crate::hashing;

/// Serialized forms a cached payload can take.
///
/// The tag travels with the value through the remote tier, so a decoded frame
/// is always well typed: a caller that cached an embedding can never read back
/// bytes it has to guess a shape for.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// Plain text payload.
    Text(String),
    /// Opaque binary payload.
    Bytes(Vec<u8>),
    /// An embedding vector.
    Embedding(Vec<f32>),
    /// A JSON document in its serialized string form.
    Json(String),
}

impl CacheValue {
    /// Approximate payload size in bytes, used for entry bookkeeping.
    pub fn approx_size(&self) -> usize {
        match self {
            Self::Text(s) | Self::Json(s) => s.len(),
            Self::Bytes(b) => b.len(),
            Self::Embedding(v) => v.len() * std::mem::size_of::<f32>(),
        }
    }
}

/// Addresses one cache entry: a namespace plus the digest of the caller key
/// and its canonicalized parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    digest: [u8; 32],
}

impl CacheKey {
    pub fn new(namespace: &str, key: &str, params: &[(&str, &str)]) -> Self {
        Self {
            namespace: namespace.to_string(),
            digest: hashing::hash_cache_key(namespace, key, params),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Renders the remote storage key as `prefix:namespace:digest-hex`.
    ///
    /// The namespace stays visible in the rendered key so namespace clears can
    /// pattern-match entries that only exist remotely.
    pub fn storage_key(&self, prefix: &str) -> String {
        format!(
            "{}:{}:{}",
            prefix,
            self.namespace,
            hashing::hex_digest(&self.digest)
        )
    }
}

/// One entry in the local tier.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: CacheValue,
    created_at: Instant,
    expires_at: Option<Instant>,
    last_accessed: Instant,
    access_count: u64,
    size_bytes: usize,
    tags: Vec<String>,
}

impl CacheEntry {
    /// Creates an entry. `None` TTL means the entry never expires; a zero TTL
    /// expires immediately.
    pub fn new(value: CacheValue, ttl: Option<Duration>, tags: Vec<String>) -> Self {
        let created_at = Instant::now();
        let size_bytes = value.approx_size();
        Self {
            value,
            created_at,
            // A TTL too large to represent acts as no TTL.
            expires_at: ttl.and_then(|ttl| created_at.checked_add(ttl)),
            last_accessed: created_at,
            access_count: 0,
            size_bytes,
            tags,
        }
    }

    pub fn value(&self) -> &CacheValue {
        &self.value
    }

    pub fn into_value(self) -> CacheValue {
        self.value
    }

    /// `true` once the deadline has passed. The check is exact at the boundary:
    /// an entry whose TTL has fully elapsed is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Records a successful read.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
        self.access_count += 1;
    }

    /// Recency marker used for eviction ordering. Entries that were never read
    /// keep their creation time here.
    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Point-in-time view of the tiered cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub errors: u64,
    /// Live entries in the local tier at snapshot time.
    pub entries: usize,
    /// `hits / (hits + misses)`, `0.0` before the first lookup.
    pub hit_rate: f64,
}

//! Local cache tier: a bounded map with lazy expiry and batch LRU eviction.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::constants::EVICTION_FRACTION;

use super::types::{CacheEntry, CacheKey, CacheValue};

/// In-process tier of the tiered cache.
///
/// Every operation takes the inner lock for its full duration and none of
/// them await, so the lock is never held across a suspension point.
pub struct LocalStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    capacity: usize,
}

impl LocalStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Looks up a value, removing it when expired. A hit updates the entry's
    /// recency bookkeeping.
    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => {
                entry.touch();
                Some(entry.value().clone())
            }
            None => None,
        }
    }

    /// Inserts an entry, evicting the least recently accessed ~20% of entries
    /// (at least one) in a single batch when the store is at capacity.
    /// Returns the number of entries evicted.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) -> usize {
        let mut entries = self.entries.lock();
        let mut evicted = 0;
        // Overwriting an existing key never needs room.
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            evicted = Self::evict_batch(&mut entries);
        }
        entries.insert(key, entry);
        evicted
    }

    fn evict_batch(entries: &mut HashMap<CacheKey, CacheEntry>) -> usize {
        let mut by_recency: Vec<(CacheKey, Instant)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_accessed()))
            .collect();
        by_recency.sort_by_key(|(_, accessed)| *accessed);

        let batch = ((entries.len() as f64 * EVICTION_FRACTION).ceil() as usize).max(1);
        for (key, _) in by_recency.into_iter().take(batch) {
            entries.remove(&key);
        }
        debug!(evicted = batch, "evicted least recently accessed batch");
        batch
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Removes every entry carrying at least one of `tags`. Returns the keys
    /// that were dropped so the caller can mirror the removal remotely.
    pub fn remove_tagged(&self, tags: &[String]) -> Vec<CacheKey> {
        let mut entries = self.entries.lock();
        let matched: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| entry.tags().iter().any(|tag| tags.contains(tag)))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matched {
            entries.remove(key);
        }
        matched
    }

    /// Removes every entry in `namespace`. Returns the keys that were dropped.
    pub fn remove_namespace(&self, namespace: &str) -> Vec<CacheKey> {
        let mut entries = self.entries.lock();
        let matched: Vec<CacheKey> = entries
            .keys()
            .filter(|key| key.namespace() == namespace)
            .cloned()
            .collect();
        for key in &matched {
            entries.remove(key);
        }
        matched
    }

    /// Drops expired entries eagerly; the background sweep calls this.
    /// Returns how many entries were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Reads an entry's access count without touching recency bookkeeping.
    pub fn peek_access_count(&self, key: &CacheKey) -> Option<u64> {
        self.entries.lock().get(key).map(|e| e.access_count())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

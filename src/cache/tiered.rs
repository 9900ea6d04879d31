//! Two-tier cache with read-through promotion.
//!
//! Reads try the in-process [`LocalStore`] first and fall back to the
//! remote tier on a miss; remote hits are promoted back into the local
//! tier under the namespace's default TTL. The remote tier is strictly
//! optional: every failure there is absorbed, counted, and logged, and
//! the cache keeps answering from local memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::codec::{decode_value, encode_value};
use super::config::CacheConfig;
use super::remote::RemoteTier;
use super::store::LocalStore;
use super::types::{CacheEntry, CacheKey, CacheStats, CacheValue};

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
    errors: AtomicU64,
}

/// Local-plus-remote cache shared by the embedding and result layers.
pub struct TieredCache<R: RemoteTier> {
    local: Arc<LocalStore>,
    remote: Option<R>,
    /// Set once when the startup ping fails; never cleared.
    remote_disabled: AtomicBool,
    counters: CacheCounters,
    config: CacheConfig,
    sweep_started: AtomicBool,
    shutdown: Arc<AtomicBool>,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

impl<R: RemoteTier> TieredCache<R> {
    /// Builds the cache. Call [`TieredCache::init`] before first use to
    /// probe the remote tier and start the expiry sweep.
    pub fn new(remote: Option<R>, config: CacheConfig) -> Self {
        Self {
            local: Arc::new(LocalStore::new(config.capacity)),
            remote,
            remote_disabled: AtomicBool::new(false),
            counters: CacheCounters::default(),
            config,
            sweep_started: AtomicBool::new(false),
            shutdown: Arc::new(AtomicBool::new(false)),
            sweep_task: Mutex::new(None),
        }
    }

    /// Pings the remote tier and starts the background expiry sweep.
    ///
    /// A failed ping disables the remote tier for the lifetime of this
    /// cache; there is no retry. The cache keeps serving from the local
    /// tier either way.
    #[instrument(skip(self))]
    pub async fn init(&self) {
        if let Some(remote) = &self.remote {
            match remote.ping().await {
                Ok(()) => info!("remote cache tier is reachable"),
                Err(e) => {
                    self.remote_disabled.store(true, Ordering::Release);
                    warn!(error = %e, "remote cache tier unreachable, continuing local-only");
                }
            }
        }
        self.start_sweep();
    }

    fn start_sweep(&self) {
        // swap returns the previous value; a second caller sees `true`
        // and backs off, so at most one sweep task ever runs.
        if self.sweep_started.swap(true, Ordering::AcqRel) {
            return;
        }

        let local = Arc::clone(&self.local);
        let shutdown = Arc::clone(&self.shutdown);
        let period = self.config.sweep_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; skip it so the
            // first sweep waits a full interval.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if shutdown.load(Ordering::Acquire) {
                    break;
                }
                let purged = local.purge_expired();
                if purged > 0 {
                    debug!(purged, "expiry sweep removed cache entries");
                }
            }
        });

        *self.sweep_task.lock() = Some(task);
    }

    /// Stops the background sweep. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self.sweep_task.lock().take() {
            task.abort();
        }
        debug!("cache expiry sweep stopped");
    }

    /// Looks up a value, falling back to the remote tier on a local
    /// miss. Remote hits are promoted into the local tier.
    #[instrument(skip(self, key), fields(namespace = %key.namespace()))]
    pub async fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        if let Some(value) = self.local.get(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }

        if let Some(value) = self.remote_lookup(key).await {
            self.promote(key, value.clone());
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Writes a value to both tiers under the namespace's default TTLs.
    #[instrument(skip(self, key, value, tags), fields(namespace = %key.namespace()))]
    pub async fn set(&self, key: &CacheKey, value: CacheValue, tags: Vec<String>) {
        let local_ttl = self.config.local_ttl(key.namespace());
        let remote_ttl = self.config.remote_ttl(key.namespace());
        self.write(key, value, tags, local_ttl, remote_ttl).await;
    }

    /// Writes a value with an explicit TTL applied to both tiers,
    /// overriding the namespace defaults.
    pub async fn set_with_ttl(
        &self,
        key: &CacheKey,
        value: CacheValue,
        tags: Vec<String>,
        ttl: Option<Duration>,
    ) {
        self.write(key, value, tags, ttl, ttl).await;
    }

    /// Removes a key from both tiers. Returns whether the local tier
    /// held it.
    pub async fn delete(&self, key: &CacheKey) -> bool {
        let removed = self.local.remove(key);
        if removed {
            self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(remote) = self.active_remote() {
            let storage_key = key.storage_key(&self.config.key_prefix);
            if let Err(e) = remote.delete(&storage_key).await {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %storage_key, error = %e, "remote cache delete failed");
            }
        }

        removed
    }

    /// Drops every local entry carrying any of `tags`, plus the same
    /// keys from the remote tier. Tags are tracked in the local tier
    /// only; entries the remote tier holds that were never local here
    /// are not matched.
    #[instrument(skip(self))]
    pub async fn invalidate_tags(&self, tags: &[String]) -> usize {
        let removed = self.local.remove_tagged(tags);
        let count = removed.len();
        if count > 0 {
            self.counters
                .deletes
                .fetch_add(count as u64, Ordering::Relaxed);
        }

        if let Some(remote) = self.active_remote() {
            let storage_keys: Vec<String> = removed
                .iter()
                .map(|key| key.storage_key(&self.config.key_prefix))
                .collect();
            let deletes = storage_keys.iter().map(|key| remote.delete(key));
            for result in join_all(deletes).await {
                if let Err(e) = result {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "remote cache delete failed during tag invalidation");
                }
            }
        }

        count
    }

    /// Drops every entry in `namespace` from both tiers. Returns the
    /// local removal count.
    #[instrument(skip(self))]
    pub async fn clear_namespace(&self, namespace: &str) -> usize {
        let removed = self.local.remove_namespace(namespace);
        let count = removed.len();
        if count > 0 {
            self.counters
                .deletes
                .fetch_add(count as u64, Ordering::Relaxed);
        }

        if let Some(remote) = self.active_remote() {
            let pattern = format!("{}:{namespace}:*", self.config.key_prefix);
            match remote.keys(&pattern).await {
                Ok(keys) => {
                    let deletes = keys.iter().map(|key| remote.delete(key));
                    for result in join_all(deletes).await {
                        if let Err(e) = result {
                            self.counters.errors.fetch_add(1, Ordering::Relaxed);
                            warn!(error = %e, "remote cache delete failed during namespace clear");
                        }
                    }
                }
                Err(e) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "remote cache key scan failed during namespace clear");
                }
            }
        }

        count
    }

    /// Point-in-time counter snapshot.
    pub fn stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            hits,
            misses,
            sets: self.counters.sets.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            entries: self.local.len(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }

    /// Local tier, exposed for tests and diagnostics.
    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Remote tier as configured, regardless of the disabled flag.
    pub fn remote(&self) -> Option<&R> {
        self.remote.as_ref()
    }

    /// Whether a remote tier is configured and passed its startup ping.
    pub fn is_remote_active(&self) -> bool {
        self.remote.is_some() && !self.remote_disabled.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: CacheValue,
        tags: Vec<String>,
        local_ttl: Option<Duration>,
        remote_ttl: Option<Duration>,
    ) {
        let entry = CacheEntry::new(value.clone(), local_ttl, tags);
        let evicted = self.local.insert(key.clone(), entry);
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
        self.counters.sets.fetch_add(1, Ordering::Relaxed);

        self.remote_store(key, &value, remote_ttl).await;
    }

    async fn remote_lookup(&self, key: &CacheKey) -> Option<CacheValue> {
        let remote = self.active_remote()?;
        let storage_key = key.storage_key(&self.config.key_prefix);

        match remote.get(&storage_key).await {
            Ok(Some(frame)) => match decode_value(&frame) {
                Ok(value) => Some(value),
                Err(e) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    warn!(key = %storage_key, error = %e, "discarding undecodable remote cache frame");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %storage_key, error = %e, "remote cache lookup failed");
                None
            }
        }
    }

    async fn remote_store(&self, key: &CacheKey, value: &CacheValue, ttl: Option<Duration>) {
        let Some(remote) = self.active_remote() else {
            return;
        };
        let storage_key = key.storage_key(&self.config.key_prefix);

        let frame = match encode_value(value, self.config.compression_threshold) {
            Ok(frame) => frame,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %storage_key, error = %e, "failed to encode cache frame");
                return;
            }
        };

        if let Err(e) = remote.set(&storage_key, frame, ttl).await {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!(key = %storage_key, error = %e, "remote cache write failed");
        }
    }

    /// Promoted entries rejoin the local tier untagged under the
    /// namespace default TTL; remote frames do not carry tags.
    fn promote(&self, key: &CacheKey, value: CacheValue) {
        let ttl = self.config.local_ttl(key.namespace());
        let entry = CacheEntry::new(value, ttl, Vec::new());
        let evicted = self.local.insert(key.clone(), entry);
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    fn active_remote(&self) -> Option<&R> {
        if self.remote_disabled.load(Ordering::Acquire) {
            return None;
        }
        self.remote.as_ref()
    }
}

impl<R: RemoteTier> std::fmt::Debug for TieredCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("entries", &self.local.len())
            .field("capacity", &self.local.capacity())
            .field("remote_active", &self.is_remote_active())
            .finish()
    }
}

impl<R: RemoteTier> Drop for TieredCache<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(any(test, feature = "mock"))]
pub type MockTieredCache = TieredCache<super::remote::MockRemoteTier>;

#[cfg(any(test, feature = "mock"))]
impl MockTieredCache {
    /// Cache over the in-memory mock tier with default config.
    pub fn new_mock() -> Self {
        Self::new(
            Some(super::remote::MockRemoteTier::new()),
            CacheConfig::default(),
        )
    }

    pub fn new_mock_with_config(config: CacheConfig) -> Self {
        Self::new(Some(super::remote::MockRemoteTier::new()), config)
    }

    /// The mock remote tier, for asserting on call counts.
    pub fn mock_remote(&self) -> &super::remote::MockRemoteTier {
        self.remote
            .as_ref()
            .expect("mock cache always has a remote tier")
    }
}

/// Cloneable handle sharing one [`TieredCache`] across the embedding
/// and result layers.
pub struct TieredCacheHandle<R: RemoteTier> {
    inner: Arc<TieredCache<R>>,
}

impl<R: RemoteTier> Clone for TieredCacheHandle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteTier> TieredCacheHandle<R> {
    pub fn new(cache: TieredCache<R>) -> Self {
        Self {
            inner: Arc::new(cache),
        }
    }

    pub async fn init(&self) {
        self.inner.init().await;
    }

    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.inner.get(key).await
    }

    pub async fn set(&self, key: &CacheKey, value: CacheValue, tags: Vec<String>) {
        self.inner.set(key, value, tags).await;
    }

    pub async fn set_with_ttl(
        &self,
        key: &CacheKey,
        value: CacheValue,
        tags: Vec<String>,
        ttl: Option<Duration>,
    ) {
        self.inner.set_with_ttl(key, value, tags, ttl).await;
    }

    pub async fn delete(&self, key: &CacheKey) -> bool {
        self.inner.delete(key).await
    }

    pub async fn invalidate_tags(&self, tags: &[String]) -> usize {
        self.inner.invalidate_tags(tags).await
    }

    pub async fn clear_namespace(&self, namespace: &str) -> usize {
        self.inner.clear_namespace(namespace).await
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    pub fn is_remote_active(&self) -> bool {
        self.inner.is_remote_active()
    }

    pub fn config(&self) -> &CacheConfig {
        self.inner.config()
    }

    /// Shared cache behind this handle.
    pub fn cache(&self) -> &TieredCache<R> {
        &self.inner
    }

    /// Number of live handles to the shared cache.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<R: RemoteTier> std::fmt::Debug for TieredCacheHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCacheHandle")
            .field("strong_count", &Arc::strong_count(&self.inner))
            .finish()
    }
}

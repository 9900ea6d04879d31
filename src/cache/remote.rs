//! Remote tier backends.
//!
//! The tiered cache talks to its second tier through [`RemoteTier`], so
//! the Redis client stays swappable for the in-memory mock in tests.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::debug;

use super::error::{RemoteTierError, RemoteTierResult};

/// Shared second tier behind the local store.
///
/// Implementations must tolerate concurrent calls; every request path
/// can issue lookups at once.
pub trait RemoteTier: Send + Sync + 'static {
    /// Health probe issued once at startup.
    fn ping(&self) -> impl std::future::Future<Output = RemoteTierResult<()>> + Send;

    /// Fetches a frame by storage key. `None` means not present.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = RemoteTierResult<Option<Vec<u8>>>> + Send;

    /// Stores a frame, optionally with an expiry.
    fn set(
        &self,
        key: &str,
        frame: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl std::future::Future<Output = RemoteTierResult<()>> + Send;

    /// Deletes a single key. Missing keys are not an error.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = RemoteTierResult<()>> + Send;

    /// Lists keys matching a glob-style pattern. Callers keep patterns
    /// scoped under a key prefix and namespace.
    fn keys(
        &self,
        pattern: &str,
    ) -> impl std::future::Future<Output = RemoteTierResult<Vec<String>>> + Send;
}

/// Redis-backed remote tier over a multiplexed connection.
///
/// The multiplexed connection pipelines commands from concurrent tasks
/// over one TCP stream, so cloning it per call is cheap.
pub struct RedisTier {
    connection: redis::aio::MultiplexedConnection,
    url: String,
}

impl RedisTier {
    /// Connects to the Redis instance at `url`.
    pub async fn connect(url: &str) -> RemoteTierResult<Self> {
        let client = redis::Client::open(url).map_err(|e| RemoteTierError::Connection {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RemoteTierError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        debug!(url = %url, "connected to remote cache tier");

        Ok(Self {
            connection,
            url: url.to_string(),
        })
    }

    /// Connection URL this tier was built from.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteTier for RedisTier {
    async fn ping(&self) -> RemoteTierResult<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> RemoteTierResult<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let frame: Option<Vec<u8>> = conn.get(key).await?;
        Ok(frame)
    }

    async fn set(&self, key: &str, frame: Vec<u8>, ttl: Option<Duration>) -> RemoteTierResult<()> {
        let mut conn = self.connection.clone();
        match ttl {
            // SETEX rejects zero, so sub-second TTLs round up.
            Some(ttl) => {
                let _: () = conn.set_ex(key, frame, ttl.as_secs().max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, frame).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> RemoteTierResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> RemoteTierResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }
}

impl std::fmt::Debug for RedisTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTier").field("url", &self.url).finish()
    }
}

/// In-memory remote tier for tests.
///
/// Frames live in a plain map; TTLs are ignored because tests drive
/// expiry through the local tier. Failure flags let tests exercise the
/// degraded paths, and call counters expose which tier served a read.
#[cfg(any(test, feature = "mock"))]
#[derive(Default)]
pub struct MockRemoteTier {
    store: std::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
    fail_ping: std::sync::atomic::AtomicBool,
    fail_commands: std::sync::atomic::AtomicBool,
    get_calls: std::sync::atomic::AtomicU64,
    set_calls: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "mock"))]
impl MockRemoteTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the startup ping fail until cleared.
    pub fn set_fail_ping(&self, fail: bool) {
        self.fail_ping
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Makes every command fail until cleared.
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of `get` calls issued, including failed ones.
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Number of `set` calls issued, including failed ones.
    pub fn set_calls(&self) -> u64 {
        self.set_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.store
            .read()
            .expect("lock poisoned")
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.store.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seeds a frame directly, bypassing the failure flags.
    pub fn seed(&self, key: &str, frame: Vec<u8>) {
        self.store
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), frame);
    }

    fn check_commands(&self) -> RemoteTierResult<()> {
        if self.fail_commands.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(RemoteTierError::Command {
                message: "mock remote tier failure".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "mock"))]
impl RemoteTier for MockRemoteTier {
    async fn ping(&self) -> RemoteTierResult<()> {
        if self.fail_ping.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(RemoteTierError::Connection {
                url: "mock://".to_string(),
                message: "mock ping failure".to_string(),
            });
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> RemoteTierResult<Option<Vec<u8>>> {
        self.get_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.check_commands()?;
        Ok(self.store.read().expect("lock poisoned").get(key).cloned())
    }

    async fn set(&self, key: &str, frame: Vec<u8>, _ttl: Option<Duration>) -> RemoteTierResult<()> {
        self.set_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.check_commands()?;
        self.store
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), frame);
        Ok(())
    }

    async fn delete(&self, key: &str) -> RemoteTierResult<()> {
        self.check_commands()?;
        self.store.write().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> RemoteTierResult<Vec<String>> {
        self.check_commands()?;
        let store = self.store.read().expect("lock poisoned");
        let matches = match pattern.strip_suffix('*') {
            Some(prefix) => store
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            None => store
                .keys()
                .filter(|k| k.as_str() == pattern)
                .cloned()
                .collect(),
        };
        Ok(matches)
    }
}

#[cfg(any(test, feature = "mock"))]
impl std::fmt::Debug for MockRemoteTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRemoteTier")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_set_get_round_trip() {
        let tier = MockRemoteTier::new();

        tier.set("sift:test:abc", vec![1, 2, 3], None).await.unwrap();
        let frame = tier.get("sift:test:abc").await.unwrap();

        assert_eq!(frame, Some(vec![1, 2, 3]));
        assert_eq!(tier.get_calls(), 1);
        assert_eq!(tier.set_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_get_missing() {
        let tier = MockRemoteTier::new();
        assert_eq!(tier.get("sift:test:missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_delete() {
        let tier = MockRemoteTier::new();
        tier.set("sift:test:abc", vec![1], None).await.unwrap();

        tier.delete("sift:test:abc").await.unwrap();
        assert!(!tier.contains_key("sift:test:abc"));

        // Deleting again is a no-op, not an error.
        tier.delete("sift:test:abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_failure_flags() {
        let tier = MockRemoteTier::new();
        tier.set_fail_ping(true);
        assert!(tier.ping().await.is_err());

        tier.set_fail_commands(true);
        assert!(tier.get("k").await.is_err());
        assert!(tier.set("k", vec![], None).await.is_err());

        tier.set_fail_commands(false);
        assert!(tier.get("k").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_keys_prefix_pattern() {
        let tier = MockRemoteTier::new();
        tier.set("sift:query:a", vec![1], None).await.unwrap();
        tier.set("sift:query:b", vec![2], None).await.unwrap();
        tier.set("sift:embedding:c", vec![3], None).await.unwrap();

        let mut matched = tier.keys("sift:query:*").await.unwrap();
        matched.sort();
        assert_eq!(matched, vec!["sift:query:a", "sift:query:b"]);

        let exact = tier.keys("sift:embedding:c").await.unwrap();
        assert_eq!(exact, vec!["sift:embedding:c"]);
    }
}

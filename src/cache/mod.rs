//! Tiered caching: in-process local store plus optional remote tier.

pub mod codec;
pub mod config;
pub mod error;
pub mod remote;
pub mod store;
pub mod tiered;
pub mod types;

#[cfg(test)]
mod store_tests;

pub use codec::{FLAG_GZIP, FLAG_RAW, decode_value, encode_value};
pub use config::CacheConfig;
pub use error::{CodecError, RemoteTierError, RemoteTierResult};
#[cfg(any(test, feature = "mock"))]
pub use remote::MockRemoteTier;
pub use remote::{RedisTier, RemoteTier};
pub use store::LocalStore;
#[cfg(any(test, feature = "mock"))]
pub use tiered::MockTieredCache;
pub use tiered::{TieredCache, TieredCacheHandle};
pub use types::{CacheEntry, CacheKey, CacheStats, CacheValue};

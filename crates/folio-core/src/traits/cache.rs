//! Cache provider trait for pluggable caching backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for cache backends (Redis or in-memory).
///
/// All values are strings. The cache provider is responsible for key
/// prefixing and TTL enforcement; every entry carries its own TTL. The lock
/// coordinator is built on [`CacheProvider::set_nx`] and
/// [`CacheProvider::delete_if_equals`], so both must be atomic on every
/// backend.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set, `false` if the key already existed.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Delete a key only while it still holds `expected`.
    /// Returns `true` if the key was deleted.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> AppResult<bool>;

    /// Check that the cache backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

//! In-memory cache implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use folio_core::config::cache::MemoryCacheConfig;
use folio_core::result::AppResult;
use folio_core::traits::cache::CacheProvider;

use crate::keys;

/// A cached value together with its own time to live.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Per-entry expiry: every insert or replace restarts the entry's TTL.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _now: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _now: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-memory cache provider using moka.
///
/// `set_nx` and `delete_if_equals` go through moka's per-key entry API, so
/// both are atomic with respect to concurrent callers in the same process.
///
/// Lock keys live in a second cache without a capacity bound: a held lock
/// must only disappear through release or lease expiry, never through
/// eviction.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, Entry>,
    locks: Cache<String, Entry>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(EntryExpiry)
            .build();
        let locks = Cache::builder().expire_after(EntryExpiry).build();
        Self { cache, locks }
    }

    fn table(&self, key: &str) -> &Cache<String, Entry> {
        if keys::is_lock_key(key) {
            &self.locks
        } else {
            &self.cache
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.table(key).get(key).await.map(|entry| entry.value))
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let entry = Entry {
            value: value.to_string(),
            ttl,
        };
        let result = self
            .table(key)
            .entry(key.to_string())
            .or_insert_with(async move { entry })
            .await;
        Ok(result.is_fresh())
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> AppResult<bool> {
        let result = self
            .table(key)
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().value == expected => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::Removed(_)))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

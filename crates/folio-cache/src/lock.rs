//! Named-resource locks on top of the cache provider.
//!
//! A lock is a cache key written with `SET NX` and a random token. The
//! holder releases it with a token-checked delete, so a holder whose lease
//! expired can never free a lock that another caller has since taken.
//! Waiting is bounded by [`LockConfig::wait_timeout`]; when it runs out the
//! caller gets [`ErrorCode::LockTimeout`](folio_core::ErrorCode::LockTimeout).

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use folio_core::config::LockConfig;
use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::traits::cache::CacheProvider;

/// Hands out named locks backed by a shared cache.
#[derive(Debug, Clone)]
pub struct LockCoordinator {
    cache: Arc<dyn CacheProvider>,
    config: LockConfig,
}

impl LockCoordinator {
    /// Create a coordinator over a cache provider.
    pub fn new(cache: Arc<dyn CacheProvider>, config: LockConfig) -> Self {
        Self { cache, config }
    }

    /// The lock settings in effect.
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Take one lock, waiting up to the configured timeout.
    pub async fn acquire(&self, key: impl Into<String>) -> AppResult<LockGuard> {
        let key = key.into();
        let token = Uuid::new_v4().to_string();
        let started = Instant::now();
        let deadline = started + self.config.wait_timeout();

        loop {
            if self
                .cache
                .set_nx(&key, &token, self.config.lease())
                .await?
            {
                debug!(
                    key = %key,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Lock acquired"
                );
                return Ok(LockGuard {
                    cache: Arc::clone(&self.cache),
                    key,
                    token,
                    released: false,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(key = %key, "Timed out waiting for lock");
                return Err(AppError::lock_timeout(&key));
            }
            tokio::time::sleep(self.config.retry_interval().min(deadline - now)).await;
        }
    }

    /// Take several locks in sorted, de-duplicated order.
    ///
    /// Every caller locks overlapping key sets in the same order, so two
    /// callers can never wait on each other. On failure the locks taken so
    /// far are released before the error is returned.
    pub async fn acquire_many<I, S>(&self, keys: I) -> AppResult<LockSet>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            match self.acquire(key).await {
                Ok(guard) => guards.push(guard),
                Err(e) => {
                    LockSet { guards }.release().await;
                    return Err(e);
                }
            }
        }
        Ok(LockSet { guards })
    }

    /// Run `task` while holding `key`.
    pub async fn with_lock<F, T>(&self, key: impl Into<String>, task: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let guard = self.acquire(key).await?;
        let result = task.await;
        guard.release().await;
        result
    }

    /// Run `task` while holding every key in `keys`.
    pub async fn with_locks<I, S, F, T>(&self, keys: I, task: F) -> AppResult<T>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Future<Output = AppResult<T>>,
    {
        let locks = self.acquire_many(keys).await?;
        let result = task.await;
        locks.release().await;
        result
    }
}

/// A held lock.
///
/// Dropping an unreleased guard schedules the release on the current Tokio
/// runtime, which covers early returns, panics and cancelled futures.
#[derive(Debug)]
pub struct LockGuard {
    cache: Arc<dyn CacheProvider>,
    key: String,
    token: String,
    released: bool,
}

impl LockGuard {
    /// The locked key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock. Returns whether this guard still owned it.
    pub async fn release(mut self) -> bool {
        self.released = true;
        match self.cache.delete_if_equals(&self.key, &self.token).await {
            Ok(owned) => {
                if !owned {
                    warn!(key = %self.key, "Lock lease expired before release");
                }
                owned
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to release lock");
                false
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(key = %self.key, "Lock dropped outside a runtime; left to expire");
            return;
        };
        let cache = Arc::clone(&self.cache);
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        handle.spawn(async move {
            if let Err(e) = cache.delete_if_equals(&key, &token).await {
                warn!(key = %key, error = %e, "Failed to release dropped lock");
            }
        });
    }
}

/// Several locks taken together by [`LockCoordinator::acquire_many`].
#[derive(Debug)]
pub struct LockSet {
    guards: Vec<LockGuard>,
}

impl LockSet {
    /// Locked keys, in acquisition order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.guards.iter().map(LockGuard::key)
    }

    /// Release every lock, last acquired first.
    pub async fn release(self) {
        for guard in self.guards.into_iter().rev() {
            guard.release().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use folio_core::config::cache::MemoryCacheConfig;
    use folio_core::error::ErrorCode;

    use super::*;
    use crate::keys;
    use crate::memory::MemoryCacheProvider;

    fn coordinator(wait_timeout_ms: u64) -> LockCoordinator {
        let cache = MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 1000 });
        LockCoordinator::new(
            Arc::new(cache),
            LockConfig {
                wait_timeout_ms,
                retry_interval_ms: 5,
                lease_seconds: 30,
            },
        )
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let locks = coordinator(100);
        let key = keys::folder_lock(Uuid::nil());
        let guard = locks.acquire(key.clone()).await.unwrap();
        assert_eq!(guard.key(), key);
        assert!(guard.release().await);
        let again = locks.acquire(key).await.unwrap();
        assert!(again.release().await);
    }

    #[tokio::test]
    async fn test_contended_lock_times_out() {
        let locks = coordinator(50);
        let key = keys::org_lock(Uuid::nil());
        let held = locks.acquire(key.clone()).await.unwrap();

        let err = locks.acquire(key.clone()).await.unwrap_err();
        assert!(err.is(ErrorCode::LockTimeout));
        assert!(err.message.contains(&key));

        held.release().await;
    }

    #[tokio::test]
    async fn test_acquire_many_sorts_and_dedups() {
        let locks = coordinator(100);
        let set = locks
            .acquire_many(["folio:lock:b", "folio:lock:a", "folio:lock:b"])
            .await
            .unwrap();
        assert_eq!(set.keys().collect::<Vec<_>>(), ["folio:lock:a", "folio:lock:b"]);
        set.release().await;
    }

    #[tokio::test]
    async fn test_acquire_many_releases_on_failure() {
        let locks = coordinator(30);
        let blocker = locks.acquire("folio:lock:b").await.unwrap();
        let err = locks
            .acquire_many(["folio:lock:a", "folio:lock:b"])
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::LockTimeout));

        // `a` was given back when `b` timed out.
        let a = locks.acquire("folio:lock:a").await.unwrap();
        a.release().await;
        blocker.release().await;
    }

    #[tokio::test]
    async fn test_dropped_guard_is_released() {
        let locks = coordinator(500);
        {
            let _guard = locks.acquire("folio:lock:dropped").await.unwrap();
        }
        let guard = locks.acquire("folio:lock:dropped").await.unwrap();
        guard.release().await;
    }

    #[tokio::test]
    async fn test_with_lock_releases_on_error() {
        let locks = coordinator(100);
        let result: AppResult<()> = locks
            .with_lock("folio:lock:err", async { Err(AppError::internal("boom")) })
            .await;
        assert!(result.is_err());
        let guard = locks.acquire("folio:lock:err").await.unwrap();
        guard.release().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lock_serializes_read_modify_write() {
        let locks = coordinator(5_000);
        let counter = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|_| {
            let locks = locks.clone();
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                locks
                    .with_lock("folio:lock:counter", async {
                        let seen = counter.load(Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        counter.store(seen + 1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            })
        });

        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }
}

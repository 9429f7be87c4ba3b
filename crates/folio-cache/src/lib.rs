//! # folio-cache
//!
//! Cache providers and the distributed lock coordinator for Folio. Supports
//! two providers:
//!
//! - **memory**: In-process cache using [moka](https://crates.io/crates/moka)
//! - **redis**: Redis-backed cache using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration. Locks taken
//! through [`LockCoordinator`] are only exclusive across processes when the
//! provider is Redis.

pub mod keys;
pub mod lock;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use lock::{LockCoordinator, LockGuard, LockSet};
pub use provider::CacheManager;

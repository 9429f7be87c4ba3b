//! Distributed lock configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the named-resource lock coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long `acquire` waits for a contended lock before failing.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_ms: u64,
    /// Delay between acquisition attempts while waiting.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
    /// Lease on a held lock; an abandoned lock expires after this.
    #[serde(default = "default_lease")]
    pub lease_seconds: u64,
}

impl LockConfig {
    /// Maximum wait as a [`Duration`].
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.max(1))
    }

    /// Lease as a [`Duration`].
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_seconds.max(1))
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_wait_timeout(),
            retry_interval_ms: default_retry_interval(),
            lease_seconds: default_lease(),
        }
    }
}

fn default_wait_timeout() -> u64 {
    5_000
}

fn default_retry_interval() -> u64 {
    25
}

fn default_lease() -> u64 {
    30
}

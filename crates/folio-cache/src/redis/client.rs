//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use folio_core::config::cache::RedisCacheConfig;
use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;

/// Redis client wrapper holding a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisClient {
    /// Connect using the cache configuration.
    pub async fn connect(config: &RedisCacheConfig) -> AppResult<Self> {
        info!(url = %mask_redis_url(&config.url), "Connecting to Redis");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Cache, "Failed to create Redis client", e)
        })?;
        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::Cache, "Failed to connect to Redis", e)
        })?;

        info!("Connected to Redis");
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// A handle on the shared connection; clones are cheap.
    pub fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Apply the configured namespace to a key.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

/// Hide the password of a Redis URL in logs.
fn mask_redis_url(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    let at_pos = match url.rfind('@') {
        Some(at_pos) if at_pos > scheme_end => at_pos,
        _ => return url.to_string(),
    };
    match url[scheme_end..at_pos].find(':') {
        Some(colon) => {
            format!("{}:****@{}", &url[..scheme_end + colon], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}

//! Response cache for rendered views.
//!
//! A [`ResponseCache`] stores serialized view contexts under string keys with
//! a time-to-live. An entry is served until `now >= stored_at + ttl`, after
//! which the next read recomputes it. Writes to the underlying data do not
//! touch the cache; staleness is bounded only by the TTL or an explicit
//! [`ResponseCache::invalidate`] / [`ResponseCache::clear`].
//!
//! Two backends are provided:
//!
//! - [`MemoryCacheBackend`]: an in-process map whose expiries come from an
//!   injected [`Clock`]
//! - [`RedisCacheBackend`]: Redis with `EX` expiry and a generation counter so
//!   clearing does not need to scan keys
//!
//! A failing backend never fails the request. Read errors fall through to the
//! compute function and write errors are logged and swallowed.
//!
//! # Example
//!
//! ```ignore
//! use yatube_common::{ResponseCache, SystemClock};
//! use std::{sync::Arc, time::Duration};
//!
//! let cache = ResponseCache::memory(Arc::new(SystemClock));
//! let view = cache
//!     .get_or_compute("index_page:1", Duration::from_secs(20), || async {
//!         render_index(1).await
//!     })
//!     .await?;
//! ```

use crate::{AppError, AppResult, Clock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fred::clients::Client as RedisClient;
use fred::interfaces::KeysInterface;
use fred::types::Expiration;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Storage behind a [`ResponseCache`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()>;

    /// Drop one entry.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Drop every entry.
    async fn clear(&self) -> AppResult<()>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-process cache backend.
#[derive(Clone)]
pub struct MemoryCacheBackend {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheBackend {
    /// Create an empty backend reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove entries whose expiry has passed.
    pub async fn purge_expired(&self) {
        let now = self.clock.now();
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it unless another writer already replaced it.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key)
            && entry.expires_at <= now
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| AppError::Internal(e.to_string()))?;
        let now = self.clock.now();

        // Expired entries go on every write, not only when their key is read.
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Redis cache backend.
#[derive(Clone)]
pub struct RedisCacheBackend {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisCacheBackend {
    /// Create a backend storing keys under `prefix`.
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn generation_key(&self) -> String {
        format!("{}:response_cache:generation", self.prefix)
    }

    fn entry_key(&self, generation: i64, key: &str) -> String {
        format!("{}:response_cache:{generation}:{key}", self.prefix)
    }

    async fn generation(&self) -> AppResult<i64> {
        let generation: Option<i64> = self
            .redis
            .get(self.generation_key())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        Ok(generation.unwrap_or(0))
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let generation = self.generation().await?;
        self.redis
            .get(self.entry_key(generation, key))
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let generation = self.generation().await?;
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);

        self.redis
            .set::<(), _, _>(
                self.entry_key(generation, key),
                value,
                Some(Expiration::EX(secs)),
                None,
                false,
            )
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let generation = self.generation().await?;
        self.redis
            .del::<(), _>(self.entry_key(generation, key))
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }

    async fn clear(&self) -> AppResult<()> {
        // Entries of older generations become unreachable and age out on their TTL.
        self.redis
            .incr::<i64, _>(self.generation_key())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        Ok(())
    }
}

/// TTL cache for rendered view contexts.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
}

impl ResponseCache {
    /// Create a cache over an arbitrary backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Create an in-process cache.
    #[must_use]
    pub fn memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new(clock)))
    }

    /// Create a Redis-backed cache.
    #[must_use]
    pub fn redis(redis: Arc<RedisClient>, prefix: impl Into<String>) -> Self {
        Self::new(Arc::new(RedisCacheBackend::new(redis, prefix)))
    }

    /// Return the cached value for `key`, or run `compute`, store its result
    /// for `ttl` and return it.
    ///
    /// Errors from `compute` are returned as-is and nothing is stored.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!(key = %key, "Response cache hit");
                    return Ok(value);
                }
                Err(e) => warn!(key = %key, error = %e, "Discarding undecodable cache entry"),
            },
            Ok(None) => debug!(key = %key, "Response cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, computing directly"),
        }

        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.backend.set(key, raw, ttl).await {
                    warn!(key = %key, error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Could not serialize value for cache"),
        }

        Ok(value)
    }

    /// Drop a single entry.
    pub async fn invalidate(&self, key: &str) -> AppResult<()> {
        self.backend.delete(key).await?;
        debug!(key = %key, "Invalidated cache entry");
        Ok(())
    }

    /// Drop every entry.
    pub async fn clear(&self) -> AppResult<()> {
        self.backend.clear().await?;
        info!("Cleared response cache");
        Ok(())
    }
}

//! Namespaced cache over the in-memory and Redis backends.

use crate::redis_store::RedisStore;
use crate::{CacheSettings, CacheType};
use derive_getters::Getters;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use versa_error::{CacheError, CacheErrorKind};

/// Cache entry with value and expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: JsonValue,
    created_at: Instant,
    ttl: Option<Duration>,
}

impl CacheEntry {
    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.ttl
            .map(|ttl| self.created_at.elapsed() > ttl)
            .unwrap_or(false)
    }

    /// Get remaining time until expiration, `None` for entries without TTL.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.ttl
            .map(|ttl| ttl.saturating_sub(self.created_at.elapsed()))
    }
}

/// Configuration for the cache.
#[derive(
    Debug,
    Clone,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct CacheConfig {
    /// Default TTL for entries stored without one (seconds, 0 = never expire)
    #[serde(default = "default_ttl")]
    #[builder(default = "default_ttl()")]
    default_ttl: u64,

    /// Maximum cache size (number of entries)
    #[serde(default = "default_max_size")]
    #[builder(default = "default_max_size()")]
    max_size: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_ttl() -> u64 {
    0
}

fn default_max_size() -> usize {
    10_000
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            max_size: default_max_size(),
            enabled: default_enabled(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    access_order: VecDeque<String>,
}

impl CacheState {
    fn forget(&mut self, key: &str) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
    }

    fn touch(&mut self, key: &str) {
        self.forget(key);
        self.access_order.push_back(key.to_string());
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self.access_order.pop_front() {
            tracing::debug!(key = %key, "Evicting LRU entry");
            self.entries.remove(&key);
        }
    }
}

/// Where entries are kept.
#[derive(Debug)]
enum Store {
    Memory(Mutex<CacheState>),
    Redis(RedisStore),
}

fn serialization_error(err: serde_json::Error) -> CacheError {
    CacheError::new(CacheErrorKind::Serialization(err.to_string()))
}

/// Namespaced key-value cache.
///
/// Values are stored as JSON so any serde type can be cached.
///
/// # Example
///
/// ```
/// use versa_cache::{Cache, CacheConfig};
///
/// # async fn example() -> Result<(), versa_error::CacheError> {
/// let cache = Cache::new("default", CacheConfig::default());
/// cache.set("greeting", &"hello", None).await?;
/// let value: Option<String> = cache.get("greeting").await?;
/// assert_eq!(value.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Cache {
    namespace: String,
    config: CacheConfig,
    store: Store,
}

impl Cache {
    /// Create a new in-memory cache for `namespace`.
    pub fn new(namespace: impl Into<String>, config: CacheConfig) -> Self {
        Self::with_store(
            namespace.into(),
            config,
            Store::Memory(Mutex::new(CacheState::default())),
        )
    }

    fn with_store(namespace: String, config: CacheConfig, store: Store) -> Self {
        tracing::debug!(
            namespace = %namespace,
            default_ttl = config.default_ttl,
            max_size = config.max_size,
            enabled = config.enabled,
            "Creating new Cache"
        );
        Self {
            namespace,
            config,
            store,
        }
    }

    /// Create the cache described by `settings`.
    ///
    /// The Redis connection is opened on first use, so an unreachable
    /// server surfaces as a backend error from the first operation.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the Redis connection details are invalid.
    #[track_caller]
    pub fn from_settings(
        namespace: impl Into<String>,
        settings: &CacheSettings,
    ) -> Result<Self, CacheError> {
        let store = match settings.cache_type {
            CacheType::Simple => Store::Memory(Mutex::new(CacheState::default())),
            CacheType::Redis => Store::Redis(RedisStore::open(settings)?),
        };
        Ok(Self::with_store(
            namespace.into(),
            CacheConfig::default(),
            store,
        ))
    }

    /// Replace the TTL, size and enablement settings.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Namespace prepended to every key.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Backend entries are kept in.
    pub fn backend(&self) -> CacheType {
        match self.store {
            Store::Memory(_) => CacheType::Simple,
            Store::Redis(_) => CacheType::Redis,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Store `value` under `key`.
    ///
    /// `ttl` of `None` uses the configured default. Redis rounds the TTL
    /// up to whole seconds.
    #[tracing::instrument(skip(self, value), fields(namespace = %self.namespace))]
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        if !self.config.enabled {
            tracing::debug!("Cache disabled, skipping insert");
            return Ok(());
        }

        let ttl = ttl.or_else(|| {
            (self.config.default_ttl > 0).then(|| Duration::from_secs(self.config.default_ttl))
        });
        let key = self.full_key(key);

        let state = match &self.store {
            Store::Memory(state) => state,
            Store::Redis(redis) => {
                let payload = serde_json::to_string(value).map_err(serialization_error)?;
                redis.set(&key, payload, ttl).await?;
                tracing::debug!(ttl = ?ttl, "Stored entry in Redis");
                return Ok(());
            }
        };

        let value = serde_json::to_value(value).map_err(serialization_error)?;
        let mut state = state.lock().await;
        if state.entries.len() >= self.config.max_size && !state.entries.contains_key(&key) {
            state.evict_lru();
        }
        state.touch(&key);
        state.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
        tracing::debug!(ttl = ?ttl, size = state.entries.len(), "Inserted entry into cache");
        Ok(())
    }

    /// Fetch the value under `key`.
    ///
    /// Expired entries are dropped and reported as missing.
    #[tracing::instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let key = self.full_key(key);
        let state = match &self.store {
            Store::Memory(state) => state,
            Store::Redis(redis) => {
                return redis
                    .get(&key)
                    .await?
                    .map(|payload| serde_json::from_str(&payload).map_err(serialization_error))
                    .transpose();
            }
        };

        let mut state = state.lock().await;
        let expired = match state.entries.get(&key) {
            None => return Ok(None),
            Some(entry) => entry.is_expired(),
        };
        if expired {
            tracing::debug!("Cache entry expired, removing");
            state.entries.remove(&key);
            state.forget(&key);
            return Ok(None);
        }

        state.touch(&key);
        let value = state.entries[&key].value.clone();
        drop(state);

        tracing::debug!("Cache hit");
        serde_json::from_value(value)
            .map(Some)
            .map_err(serialization_error)
    }

    /// Remove `key`, returning whether it was present.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let key = self.full_key(key);
        match &self.store {
            Store::Memory(state) => {
                let mut state = state.lock().await;
                state.forget(&key);
                Ok(state.entries.remove(&key).is_some())
            }
            Store::Redis(redis) => redis.delete(&key).await,
        }
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// This is the async counterpart of a memoizing decorator: `compute`
    /// only runs on a miss.
    pub async fn get_or_insert_with<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }
        let value = compute().await?;
        self.set(key, &value, ttl).await?;
        Ok(value)
    }

    /// Remove expired entries from cache.
    ///
    /// Redis expires entries itself, so this is a no-op there.
    pub async fn cleanup_expired(&self) -> usize {
        let Store::Memory(state) = &self.store else {
            return 0;
        };
        let mut state = state.lock().await;
        let before = state.entries.len();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.entries.remove(key);
            state.forget(key);
        }
        let removed = before - state.entries.len();
        if removed > 0 {
            tracing::info!(removed, remaining = state.entries.len(), "Cleaned up expired cache entries");
        }
        removed
    }

    /// Clear all entries of this namespace.
    pub async fn clear(&self) -> Result<(), CacheError> {
        let count = match &self.store {
            Store::Memory(state) => {
                let mut state = state.lock().await;
                let count = state.entries.len();
                state.entries.clear();
                state.access_order.clear();
                count
            }
            Store::Redis(redis) => redis.clear(&self.namespace).await?,
        };
        tracing::info!(cleared = count, "Cleared cache");
        Ok(())
    }

    /// Get number of cached entries.
    pub async fn len(&self) -> Result<usize, CacheError> {
        match &self.store {
            Store::Memory(state) => Ok(state.lock().await.entries.len()),
            Store::Redis(redis) => Ok(redis.keys(&self.namespace).await?.len()),
        }
    }

    /// Check if cache is empty.
    pub async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }
}

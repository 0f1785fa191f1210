//! Namespaced key-value caching with TTL support.
//!
//! The `simple` backend keeps JSON-encoded values in process memory with
//! least-recently-used eviction. The `redis` backend stores the same JSON
//! text on a Redis server and leaves expiry to `SET EX`. Every key is
//! prefixed with the bot namespace so several bots can share one backend.

#![warn(missing_docs)]

mod cache;
mod redis_store;
mod settings;

pub use cache::{Cache, CacheConfig, CacheConfigBuilder, CacheEntry};
pub use settings::{CacheSettings, CacheType, REDIS_PORT};

//! Tests for the cache front end and its backends.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use versa_cache::{Cache, CacheConfig, CacheConfigBuilder, CacheSettings, CacheType};
use versa_error::{CacheError, CacheErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Owners {
    ids: Vec<u64>,
}

#[tokio::test]
async fn test_round_trip_struct() {
    let cache = Cache::new("bot", CacheConfig::default());
    let owners = Owners { ids: vec![1, 2] };
    cache.set("owners", &owners, None).await.unwrap();

    let loaded: Option<Owners> = cache.get("owners").await.unwrap();
    assert_eq!(loaded, Some(owners));
}

#[tokio::test]
async fn test_expired_entry_is_missing() {
    let cache = Cache::new("bot", CacheConfig::default());
    cache
        .set("short", &1u32, Some(Duration::from_millis(20)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let loaded: Option<u32> = cache.get("short").await.unwrap();
    assert!(loaded.is_none());
    assert!(cache.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_lru_eviction_at_capacity() {
    let config = CacheConfigBuilder::default().max_size(2).build().unwrap();
    let cache = Cache::new("bot", config);
    cache.set("a", &1u32, None).await.unwrap();
    cache.set("b", &2u32, None).await.unwrap();

    // Touch "a" so "b" becomes least recently used.
    let _: Option<u32> = cache.get("a").await.unwrap();
    cache.set("c", &3u32, None).await.unwrap();

    assert_eq!(cache.len().await.unwrap(), 2);
    assert_eq!(cache.get::<u32>("a").await.unwrap(), Some(1));
    assert_eq!(cache.get::<u32>("b").await.unwrap(), None);
    assert_eq!(cache.get::<u32>("c").await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_disabled_cache_stores_nothing() {
    let cache = Cache::new("bot", CacheConfig::default().with_enabled(false));
    cache.set("key", &"value", None).await.unwrap();
    assert_eq!(cache.get::<String>("key").await.unwrap(), None);
}

#[tokio::test]
async fn test_wrong_type_is_serialization_error() {
    let cache = Cache::new("bot", CacheConfig::default());
    cache.set("key", &"text", None).await.unwrap();
    let err = cache.get::<u32>("key").await.unwrap_err();
    assert!(matches!(err.kind, CacheErrorKind::Serialization(_)));
}

#[tokio::test]
async fn test_get_or_insert_with_computes_once() {
    let cache = Cache::new("bot", CacheConfig::default());
    let mut calls = 0;

    let first: Result<u32, CacheError> = cache
        .get_or_insert_with("answer", None, || {
            calls += 1;
            async { Ok(42) }
        })
        .await;
    assert_eq!(first.unwrap(), 42);

    let second: Result<u32, CacheError> = cache
        .get_or_insert_with("answer", None, || async { Ok(0) })
        .await;
    assert_eq!(second.unwrap(), 42);
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_delete_and_clear() {
    let cache = Cache::new("bot", CacheConfig::default());
    cache.set("a", &1u8, None).await.unwrap();
    cache.set("b", &2u8, None).await.unwrap();

    assert!(cache.delete("a").await.unwrap());
    assert!(!cache.delete("a").await.unwrap());
    cache.clear().await.unwrap();
    assert!(cache.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_cleanup_expired_counts_removed() {
    let cache = Cache::new("bot", CacheConfig::default());
    cache
        .set("gone", &1u8, Some(Duration::from_millis(10)))
        .await
        .unwrap();
    cache.set("kept", &2u8, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(cache.cleanup_expired().await, 1);
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[test]
fn test_from_settings_picks_backend() {
    let cache = Cache::from_settings("bot", &CacheSettings::default()).unwrap();
    assert_eq!(cache.namespace(), "bot");
    assert_eq!(cache.backend(), CacheType::Simple);

    // Building a Redis cache does not need a reachable server.
    let settings = CacheSettings {
        cache_type: CacheType::Redis,
        host: Some("127.0.0.1".to_string()),
        db: 2,
        ..CacheSettings::default()
    };
    let cache = Cache::from_settings("bot", &settings).unwrap();
    assert_eq!(cache.namespace(), "bot");
    assert_eq!(cache.backend(), CacheType::Redis);
}

#[tokio::test]
async fn test_disabled_redis_cache_never_connects() {
    let settings = CacheSettings {
        cache_type: CacheType::Redis,
        host: Some("127.0.0.1".to_string()),
        port: Some(1),
        ..CacheSettings::default()
    };
    let cache = Cache::from_settings("bot", &settings)
        .unwrap()
        .with_config(CacheConfig::default().with_enabled(false));

    cache.set("key", &"value", None).await.unwrap();
    assert_eq!(cache.get::<String>("key").await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires a Redis server, host taken from VERSA_TEST_REDIS_HOST
async fn test_redis_round_trip() {
    let host = std::env::var("VERSA_TEST_REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let settings = CacheSettings {
        cache_type: CacheType::Redis,
        host: Some(host),
        ..CacheSettings::default()
    };
    let cache = Cache::from_settings("versa_test", &settings).unwrap();
    cache.clear().await.unwrap();

    let owners = Owners { ids: vec![7, 8] };
    cache.set("owners", &owners, None).await.unwrap();
    cache
        .set("short", &1u8, Some(Duration::from_millis(200)))
        .await
        .unwrap();
    assert_eq!(cache.get::<Owners>("owners").await.unwrap(), Some(owners));
    assert_eq!(cache.len().await.unwrap(), 2);

    // SET EX rounds the TTL up to one second.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get::<u8>("short").await.unwrap(), None);

    assert!(cache.delete("owners").await.unwrap());
    assert!(cache.is_empty().await.unwrap());
}

#[test]
fn test_settings_need_details_only_for_servers() {
    let mut settings = CacheSettings::default();
    assert!(!settings.needs_connection_details());
    assert_eq!(settings.effective_port(), None);

    settings.cache_type = CacheType::Redis;
    assert!(settings.needs_connection_details());
    assert_eq!(settings.effective_port(), Some(6379));

    settings.host = Some("cache.internal".to_string());
    assert!(!settings.needs_connection_details());
}

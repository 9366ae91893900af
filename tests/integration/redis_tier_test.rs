//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis层集成测试，Redis不可用时跳过

#[path = "../common/mod.rs"]
mod common;

use common::{memory_tier, setup_logging, unique_key, widget, widget_bytes, CallCounter, Widget};
use std::sync::Arc;
use std::time::Duration;
use tiercache::config::RedisTierConfig;
use tiercache::{MultiCache, RedisStore, Store, Tier};

// 优先使用环境变量 REDIS_URL，如果没有则使用本地无密码连接
fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn redis_config() -> RedisTierConfig {
    RedisTierConfig {
        name: "redis".to_string(),
        connection_string: redis_url().into(),
        connection_timeout_ms: 1000,
        key_prefix: Some("tiercache_test".to_string()),
        ..Default::default()
    }
}

async fn connect_or_skip(test: &str) -> Option<RedisStore> {
    let store = match RedisStore::connect(&redis_config()).await {
        Ok(store) => store,
        Err(e) => {
            println!("Skipping {} because Redis is not available: {}", test, e);
            return None;
        }
    };
    if let Err(e) = store.ping().await {
        println!("Skipping {} because Redis ping failed: {}", test, e);
        return None;
    }
    Some(store)
}

#[tokio::test]
async fn test_redis_set_get_delete() {
    setup_logging();
    let Some(store) = connect_or_skip("test_redis_set_get_delete").await else {
        return;
    };
    let key = unique_key("redis_basic");

    store
        .set(&key, b"value".to_vec(), Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(store.get(&key).await.unwrap(), Some(b"value".to_vec()));

    store.delete(&key).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_redis_ttl_expires() {
    setup_logging();
    let Some(store) = connect_or_skip("test_redis_ttl_expires").await else {
        return;
    };
    let key = unique_key("redis_ttl");

    store
        .set(&key, b"short".to_vec(), Duration::from_millis(100))
        .await
        .unwrap();
    assert!(store.get(&key).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_redis_zero_ttl_never_expires() {
    setup_logging();
    let Some(store) = connect_or_skip("test_redis_zero_ttl_never_expires").await else {
        return;
    };
    let key = unique_key("redis_zero_ttl");

    store.set(&key, b"forever".to_vec(), Duration::ZERO).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.get(&key).await.unwrap(), Some(b"forever".to_vec()));

    // PTTL 为 -1 表示键没有过期时间
    let client = redis::Client::open(redis_url()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let pttl: i64 = redis::cmd("PTTL")
        .arg(format!("tiercache_test:{}", key))
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(pttl, -1);

    store.delete(&key).await.unwrap();
}

#[tokio::test]
async fn test_wrap_backfills_memory_from_redis() {
    setup_logging();
    let Some(store) = connect_or_skip("test_wrap_backfills_memory_from_redis").await else {
        return;
    };
    let key = unique_key("redis_backfill");
    let redis = Arc::new(store);

    let (memory, memory_tier) = memory_tier("memory", Duration::from_millis(100));
    let cache = MultiCache::builder("redis_backfill")
        .tier(memory_tier)
        .tier(Tier::new("redis", redis.clone(), Duration::from_secs(10)))
        .build();

    redis
        .set(&key, widget_bytes("foo"), Duration::from_secs(10))
        .await
        .unwrap();

    let calls = CallCounter::default();
    let counter = calls.clone();
    let value: Widget = cache
        .wrap(
            &key,
            move || async move {
                counter.hit();
                Ok(widget("computed"))
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(value, widget("foo"));
    assert_eq!(calls.count(), 0);
    assert_eq!(memory.get(&key).await.unwrap(), Some(widget_bytes("foo")));

    cache.delete(&key).await.unwrap();
    assert_eq!(redis.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_connect_to_unreachable_redis_fails() {
    setup_logging();
    let config = RedisTierConfig {
        connection_string: "redis://127.0.0.1:1".to_string().into(),
        connection_timeout_ms: 200,
        ..Default::default()
    };
    assert!(RedisStore::connect(&config).await.is_err());
}

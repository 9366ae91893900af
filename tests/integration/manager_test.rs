//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存管理器集成测试：从配置构建并注册多层缓存

#[path = "../common/mod.rs"]
mod common;

use common::{setup_logging, widget, Widget};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tiercache::config::Config;
use tiercache::{get_cache, CacheError, CacheManager, WritePolicy};

const TWO_MEMORY_TIERS: &str = r#"
config_version = 1

[global]
default_ttl_ms = 60000
serialization = "json"
enable_metrics = false

[caches.users]
write_policy = "attempt_all"
coalesce_wrap = true

[[caches.users.tiers]]
type = "memory"
name = "hot"
ttl_ms = 100
max_capacity = 100

[[caches.users.tiers]]
type = "memory"
name = "warm"
max_capacity = 1000
"#;

#[tokio::test]
#[serial]
async fn test_init_from_toml_string() {
    setup_logging();
    CacheManager::reset();

    let config = Config::from_toml_str(TWO_MEMORY_TIERS).unwrap();
    CacheManager::init(config).await.unwrap();

    let cache = get_cache("users").unwrap();
    assert_eq!(cache.name(), "users");
    assert_eq!(cache.write_policy(), WritePolicy::AttemptAll);

    let names: Vec<&str> = cache.tiers().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["hot", "warm"]);
    assert_eq!(cache.tiers()[0].default_ttl(), Duration::from_millis(100));
    // 未配置 ttl_ms 的层回退到全局默认值
    assert_eq!(cache.tiers()[1].default_ttl(), Duration::from_secs(60));

    cache.set("u:1", &widget("alice"), None).await.unwrap();
    let value: Option<Widget> = cache.get("u:1").await.unwrap();
    assert_eq!(value, Some(widget("alice")));

    CacheManager::reset();
}

#[tokio::test]
#[serial]
async fn test_init_from_file() {
    setup_logging();
    CacheManager::reset();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(TWO_MEMORY_TIERS.as_bytes()).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    CacheManager::init(config).await.unwrap();

    let cache = get_cache("users").unwrap();
    let value: Widget = cache
        .wrap("u:2", || async { Ok(widget("bob")) }, None)
        .await
        .unwrap();
    assert_eq!(value, widget("bob"));

    let hot = cache.tier("hot").unwrap();
    assert!(hot.store().get("u:2").await.unwrap().is_some());

    CacheManager::reset();
}

#[tokio::test]
#[serial]
async fn test_unknown_cache_is_an_error() {
    setup_logging();
    CacheManager::reset();

    let err = get_cache("missing").unwrap_err();
    assert!(matches!(err, CacheError::ConfigError(_)));
}

#[tokio::test]
#[serial]
async fn test_invalid_config_is_rejected() {
    setup_logging();
    CacheManager::reset();

    let config = Config::from_toml_str(
        r#"
[caches.broken]

[[caches.broken.tiers]]
type = "memory"
name = "dup"

[[caches.broken.tiers]]
type = "memory"
name = "dup"
"#,
    )
    .unwrap();

    let err = CacheManager::init(config).await.unwrap_err();
    assert!(matches!(err, CacheError::ConfigError(_)));
    assert!(get_cache("broken").is_err());
}

#[test]
fn test_unknown_tier_type_fails_to_parse() {
    let result = Config::from_toml_str(
        r#"
[[caches.c.tiers]]
type = "memcached"
name = "m"
"#,
    );
    assert!(matches!(result, Err(CacheError::ConfigError(_))));
}

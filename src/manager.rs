//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存管理器，负责根据配置构建并注册所有多层缓存。

use crate::backend::{MemoryStore, RedisStore, Store};
use crate::client::{MultiCache, Tier};
use crate::config::{Config, GlobalConfig, MultiCacheConfig, TierConfig};
use crate::error::{CacheError, Result};
use crate::serialization::SerializerEnum;
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::{debug, info, instrument};

lazy_static! {
    /// 全局多层缓存注册表
    pub static ref MANAGER: Arc<DashMap<String, Arc<MultiCache>>> = Arc::new(DashMap::new());
}

/// 缓存管理器
pub struct CacheManager;

impl CacheManager {
    /// 初始化缓存管理器
    ///
    /// 验证配置后为每个配置的缓存构建多层缓存并注册，同名缓存会被覆盖
    ///
    /// # 参数
    ///
    /// * `config` - 缓存系统配置
    #[instrument(skip(config), level = "info", fields(cache_count = config.caches.len()))]
    pub async fn init(config: Config) -> Result<()> {
        config.validate().map_err(CacheError::ConfigError)?;

        info!("Initializing CacheManager with {} caches", config.caches.len());
        for (name, cache_cfg) in &config.caches {
            let cache = build_cache(name, cache_cfg, &config.global).await?;
            MANAGER.insert(name.clone(), Arc::new(cache));
        }
        Ok(())
    }

    /// 重置缓存管理器（仅用于测试）
    #[doc(hidden)]
    pub fn reset() {
        MANAGER.clear();
    }
}

/// 根据层配置创建存储
#[instrument(skip(tier), level = "debug", fields(tier = %tier.name()))]
pub async fn build_store(tier: &TierConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match tier {
        TierConfig::Memory(memory) => Arc::new(MemoryStore::new(memory.max_capacity)),
        TierConfig::Redis(redis) => Arc::new(RedisStore::connect(redis).await?),
    };
    Ok(store)
}

/// 根据配置构建一个多层缓存
///
/// # 参数
///
/// * `name` - 缓存名称
/// * `config` - 该缓存的配置
/// * `global` - 全局配置，提供默认TTL、序列化和指标开关
#[instrument(skip(config, global), level = "info")]
pub async fn build_cache(
    name: &str,
    config: &MultiCacheConfig,
    global: &GlobalConfig,
) -> Result<MultiCache> {
    let mut tiers = Vec::with_capacity(config.tiers.len());
    for tier_cfg in &config.tiers {
        let store = build_store(tier_cfg).await?;
        let ttl = tier_cfg.default_ttl(global);
        debug!("cache {}: tier {} ttl={:?}", name, tier_cfg.name(), ttl);
        tiers.push(Tier::new(tier_cfg.name(), store, ttl));
    }

    let serialization = config
        .serialization
        .as_ref()
        .unwrap_or(&global.serialization);

    Ok(MultiCache::builder(name)
        .tiers(tiers)
        .write_policy(config.write_policy)
        .coalesce_wrap(config.coalesce_wrap)
        .serializer(SerializerEnum::from_type(serialization))
        .enable_metrics(global.enable_metrics)
        .build())
}

/// 获取指定名称的多层缓存
pub fn get_cache(name: &str) -> Result<Arc<MultiCache>> {
    MANAGER
        .get(name)
        .map(|r| r.value().clone())
        .ok_or_else(|| CacheError::ConfigError(format!("Cache '{}' not found", name)))
}

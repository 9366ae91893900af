//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于内存的缓存存储，使用Moka作为底层缓存库。

use super::Store;
use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// 内存缓存存储
///
/// 容量淘汰交给Moka，每个条目记录自己的过期时间点，读取时惰性清理。
#[derive(Clone)]
pub struct MemoryStore {
    // 值: (数据, 过期时间)
    cache: Cache<String, (Vec<u8>, Option<Instant>)>,
}

impl MemoryStore {
    /// 创建新的内存存储
    ///
    /// # 参数
    ///
    /// * `max_capacity` - 最大条目数
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// 清空所有条目
    #[instrument(skip(self), level = "debug")]
    pub fn clear(&self) {
        debug!("memory clear: invalidating all entries");
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl Store for MemoryStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.cache.get(key).await {
            Some((bytes, expire_at)) => {
                if let Some(expire_time) = expire_at {
                    if Instant::now() >= expire_time {
                        self.cache.remove(key).await;
                        debug!("memory get: key={}, expired=true, removed", key);
                        return Ok(None);
                    }
                }
                debug!("memory get: key={}, found=true", key);
                Ok(Some(bytes))
            }
            None => {
                debug!("memory get: key={}, found=false", key);
                Ok(None)
            }
        }
    }

    /// 写入缓存值，`ttl` 为零表示永不过期
    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expire_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        self.cache.insert(key.to_string(), (value, expire_at)).await;
        debug!("memory set: key={}, ttl={:?}", key, ttl);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.remove(key).await;
        debug!("memory delete: key={}", key);
        Ok(())
    }
}

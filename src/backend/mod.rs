//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存存储后端的统一能力接口，以及内存和Redis两种实现。

pub mod memory;
pub mod redis_store;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// 存储能力特征
///
/// 多层缓存编排器只通过这三个操作访问每一层，
/// 淘汰、持久化和过期都由具体存储自行负责。
#[async_trait]
pub trait Store: Send + Sync {
    /// 读取缓存值，`Ok(None)` 表示未命中，不是错误
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入缓存值，`ttl` 为该条目的存活时间，`Duration::ZERO` 表示永不过期
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// 删除缓存项，键不存在时也视为成功
    async fn delete(&self, key: &str) -> Result<()>;
}

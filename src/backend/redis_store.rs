//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的远程缓存存储。

use super::Store;
use crate::config::RedisTierConfig;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use secrecy::ExposeSecret;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Redis缓存存储
///
/// 使用 `ConnectionManager` 自动重连，每条命令都受 `command_timeout_ms` 约束。
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    key_prefix: Option<String>,
    command_timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl RedisStore {
    /// 连接Redis并创建存储
    ///
    /// # 参数
    ///
    /// * `config` - Redis层配置
    ///
    /// # 返回值
    ///
    /// 返回新的RedisStore实例，连接超时返回 `CacheError::Timeout`
    #[instrument(skip(config), level = "info", fields(tier = %config.name))]
    pub async fn connect(config: &RedisTierConfig) -> Result<Self> {
        let raw = config.connection_string.expose_secret();
        let connection_string = if config.enable_tls && !raw.starts_with("rediss://") {
            raw.replace("redis://", "rediss://")
        } else {
            raw.to_string()
        };

        let client = Client::open(connection_string.as_str())?;
        let manager = match timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        {
            Ok(res) => res?,
            Err(_) => {
                return Err(CacheError::Timeout(format!(
                    "Redis connection timed out after {}ms",
                    config.connection_timeout_ms
                )));
            }
        };
        debug!("Redis store connected: tier={}", config.name);

        Ok(Self {
            manager,
            key_prefix: config.key_prefix.clone(),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        })
    }

    /// 检查连接是否正常
    #[instrument(skip(self), level = "debug")]
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let response = self
            .bounded("PING", redis::cmd("PING").query_async::<String>(&mut conn))
            .await?;
        debug!("Redis ping response: {}", response);
        Ok(())
    }

    fn full_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.command_timeout, fut).await {
            Ok(res) => res.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(format!(
                "Redis {} timed out after {:?}",
                op, self.command_timeout
            ))),
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let full_key = self.full_key(key);
        let value: Option<Vec<u8>> = self
            .bounded(
                "GET",
                redis::cmd("GET").arg(&full_key).query_async(&mut conn),
            )
            .await?;
        debug!("redis get: key={}, found={}", full_key, value.is_some());
        Ok(value)
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        let full_key = self.full_key(key);
        let mut cmd = redis::cmd("SET");
        cmd.arg(&full_key).arg(value);
        if !ttl.is_zero() {
            // PX 要求正整数，不足1毫秒的TTL按1毫秒处理
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            cmd.arg("PX").arg(ttl_ms);
        }
        let _: () = self.bounded("SET", cmd.query_async(&mut conn)).await?;
        debug!("redis set: key={}, ttl={:?}", full_key, ttl);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let full_key = self.full_key(key);
        let _: () = self
            .bounded("DEL", redis::cmd("DEL").arg(&full_key).query_async(&mut conn))
            .await?;
        debug!("redis delete: key={}", full_key);
        Ok(())
    }
}

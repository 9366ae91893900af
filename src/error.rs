//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了多层缓存系统的错误类型和处理机制。

use thiserror::Error;

/// 缓存系统错误类型枚举
///
/// 存储后端返回的是底层错误（Redis、超时等），
/// 编排器在向调用方传播时会包装成带层名称的 `TierRead` / `TierWrite`。
#[derive(Error, Debug)]
pub enum CacheError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 存储后端错误
    #[error("Backend error: {0}")]
    Backend(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 某一层读取失败，读取流程被中止
    #[error("read from tier '{tier}' failed: {source}")]
    TierRead {
        tier: String,
        #[source]
        source: Box<CacheError>,
    },

    /// 某一层写入（或删除）失败
    #[error("write to tier '{tier}' failed: {source}")]
    TierWrite {
        tier: String,
        #[source]
        source: Box<CacheError>,
    },

    /// `wrap` 的计算函数失败，原样传播
    #[error("compute failed: {0}")]
    Compute(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CacheError {
    /// 将任意错误包装为计算错误
    pub fn compute<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        CacheError::Compute(err.into())
    }

    pub(crate) fn tier_read(tier: &str, source: CacheError) -> Self {
        CacheError::TierRead {
            tier: tier.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn tier_write(tier: &str, source: CacheError) -> Self {
        CacheError::TierWrite {
            tier: tier.to_string(),
            source: Box::new(source),
        }
    }

    /// 失败层的名称（仅对层读写错误有效）
    pub fn tier(&self) -> Option<&str> {
        match self {
            CacheError::TierRead { tier, .. } | CacheError::TierWrite { tier, .. } => {
                Some(tier.as_str())
            }
            _ => None,
        }
    }
}

/// 缓存操作结果类型别名
///
/// 简化错误处理，所有缓存操作都返回此类型
pub type Result<T> = std::result::Result<T, CacheError>;

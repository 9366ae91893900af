//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了多层缓存的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_VERSION: u32 = 1;

/// TTL 上限：30天（毫秒）
const MAX_TTL_MS: u64 = 86_400 * 30 * 1000;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub caches: HashMap<String, MultiCacheConfig>,
}

/// 全局配置
///
/// 定义适用于所有多层缓存的默认配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GlobalConfig {
    /// 层未指定 `ttl_ms` 时使用的默认过期时间（毫秒）
    pub default_ttl_ms: u64,
    /// 序列化类型
    pub serialization: SerializationType,
    /// 是否启用指标收集
    pub enable_metrics: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: 300_000,
            serialization: SerializationType::Json,
            enable_metrics: true,
        }
    }
}

/// 序列化类型枚举
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SerializationType {
    /// JSON序列化
    #[default]
    Json,
    /// 启用gzip压缩的JSON序列化
    JsonGzip,
}

/// 扇出写入的失败策略
///
/// 作用于 `set`、`delete` 以及 `wrap` 计算后的写入，回填始终是尽力而为。
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// 并发写入所有层，第一个失败立即返回，其余未完成的写入被丢弃
    #[default]
    FailFast,
    /// 并发写入所有层并等待全部完成，返回序号最小的失败层错误
    AttemptAll,
}

/// 单个多层缓存的配置
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct MultiCacheConfig {
    /// 按优先级排列的层，下标0最先被读取
    pub tiers: Vec<TierConfig>,
    /// 扇出写入策略
    pub write_policy: WritePolicy,
    /// 是否合并同一键上并发的 `wrap` 计算
    pub coalesce_wrap: bool,
    /// 序列化类型，可覆盖全局配置
    pub serialization: Option<SerializationType>,
}

/// 层配置
#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TierConfig {
    /// 进程内存层
    Memory(MemoryTierConfig),
    /// Redis远程层
    Redis(RedisTierConfig),
}

impl TierConfig {
    pub fn name(&self) -> &str {
        match self {
            TierConfig::Memory(c) => &c.name,
            TierConfig::Redis(c) => &c.name,
        }
    }

    pub fn ttl_ms(&self) -> Option<u64> {
        match self {
            TierConfig::Memory(c) => c.ttl_ms,
            TierConfig::Redis(c) => c.ttl_ms,
        }
    }

    /// 该层的默认TTL，未配置时回退到全局默认值
    pub fn default_ttl(&self, global: &GlobalConfig) -> Duration {
        Duration::from_millis(self.ttl_ms().unwrap_or(global.default_ttl_ms))
    }
}

/// 内存层配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct MemoryTierConfig {
    pub name: String,
    pub ttl_ms: Option<u64>,
    /// 最大条目数
    pub max_capacity: u64,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            name: "memory".to_string(),
            ttl_ms: None,
            max_capacity: 10_000,
        }
    }
}

/// Redis层配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisTierConfig {
    pub name: String,
    pub ttl_ms: Option<u64>,
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// 是否启用 TLS
    pub enable_tls: bool,
    /// 键前缀，用于多个服务共享同一个Redis
    pub key_prefix: Option<String>,
}

impl Default for RedisTierConfig {
    fn default() -> Self {
        Self {
            name: "redis".to_string(),
            ttl_ms: None,
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            enable_tls: false,
            key_prefix: None,
        }
    }
}

impl Config {
    /// 从TOML字符串解析配置
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CacheError::ConfigError(e.to_string()))
    }

    /// 从TOML文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值都在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = self.config_version {
            if version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        if self.global.default_ttl_ms == 0 {
            return Err("Global default_ttl_ms cannot be zero".to_string());
        }
        if self.global.default_ttl_ms > MAX_TTL_MS {
            return Err("Global default_ttl_ms cannot exceed 30 days".to_string());
        }

        for (name, cache) in &self.caches {
            if name.is_empty() {
                return Err("Cache name cannot be empty".to_string());
            }
            if name.len() > 64 {
                return Err(format!(
                    "Cache name '{}' exceeds maximum length of 64 characters",
                    name
                ));
            }

            let mut seen = HashSet::new();
            for tier in &cache.tiers {
                let tier_name = tier.name();
                if tier_name.is_empty() {
                    return Err(format!("Cache '{}' has a tier with an empty name", name));
                }
                if !seen.insert(tier_name) {
                    return Err(format!(
                        "Cache '{}' has duplicate tier name '{}'",
                        name, tier_name
                    ));
                }

                if let Some(ttl) = tier.ttl_ms() {
                    if ttl == 0 {
                        return Err(format!(
                            "Cache '{}' tier '{}' ttl_ms cannot be zero",
                            name, tier_name
                        ));
                    }
                    if ttl > MAX_TTL_MS {
                        return Err(format!(
                            "Cache '{}' tier '{}' ttl_ms cannot exceed 30 days",
                            name, tier_name
                        ));
                    }
                }

                match tier {
                    TierConfig::Memory(memory) => {
                        if memory.max_capacity == 0 || memory.max_capacity > 10_000_000 {
                            return Err(format!(
                                "Cache '{}' tier '{}' max_capacity must be between 1 and 10,000,000",
                                name, tier_name
                            ));
                        }
                    }
                    TierConfig::Redis(redis) => {
                        if !(100..=30000).contains(&redis.connection_timeout_ms) {
                            return Err(format!(
                                "Cache '{}' tier '{}' connection_timeout_ms must be between 100 and 30000 ms",
                                name, tier_name
                            ));
                        }
                        if !(100..=60000).contains(&redis.command_timeout_ms) {
                            return Err(format!(
                                "Cache '{}' tier '{}' command_timeout_ms must be between 100 and 60000 ms",
                                name, tier_name
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

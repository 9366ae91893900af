//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存层以及多层缓存编排器。

pub mod multi_level;

use crate::backend::Store;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use multi_level::{MultiCache, MultiCacheBuilder};

/// 缓存层
///
/// 一个存储加上它自己的默认TTL。构造后不可修改，
/// 编排器按层在列表中的位置决定读取优先级。
#[derive(Clone)]
pub struct Tier {
    name: String,
    store: Arc<dyn Store>,
    default_ttl: Duration,
}

impl Tier {
    /// 创建新的缓存层
    ///
    /// # 参数
    ///
    /// * `name` - 层名称，用于日志、指标和错误信息
    /// * `store` - 底层存储
    /// * `default_ttl` - 该层的默认过期时间
    pub fn new(name: impl Into<String>, store: Arc<dyn Store>, default_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            store,
            default_ttl,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl fmt::Debug for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tier")
            .field("name", &self.name)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

//! tiercache - 多层缓存编排库
//!
//! 把任意数量的缓存存储（进程内存、Redis……）按优先级组合成一个逻辑缓存：
//! 瀑布式读取、扇出写入，以及在慢层命中时回填快层的读取或计算（`wrap`）。

#![doc(html_root_url = "https://docs.rs/tiercache/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod serialization;
pub mod sync;
pub mod telemetry;

// Re-export commonly used items
pub use backend::{MemoryStore, RedisStore, Store};
pub use client::{MultiCache, MultiCacheBuilder, Tier};
pub use config::{Config, WritePolicy};
pub use error::{CacheError, Result};
pub use manager::{get_cache, CacheManager};

/// tiercache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

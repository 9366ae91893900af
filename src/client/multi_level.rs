//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了多层缓存编排器：按优先级瀑布式读取、扇出写入，
//! 以及带选择性回填的读取或计算（`wrap`）。

use super::Tier;
use crate::backend::Store;
use crate::config::WritePolicy;
use crate::error::{CacheError, Result};
use crate::metrics::GLOBAL_METRICS;
use crate::serialization::{Serializer, SerializerEnum};
use crate::sync::single_flight::{Flight, SingleFlight};
use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// 多层缓存编排器
///
/// 持有一组按优先级排列的层（下标0最先读取），自身不缓存任何值。
/// 克隆开销很小，所有克隆共享同一组层。
///
/// - `get` 按顺序探测，命中即返回，不修改任何层
/// - `set` / `delete` 并发写入所有层，失败按 [`WritePolicy`] 报告，不回滚
/// - `wrap` 命中时回填更快的层（尽力而为），全部未命中时调用计算函数一次并写入所有层
#[derive(Clone)]
pub struct MultiCache {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    tiers: Vec<Tier>,
    write_policy: WritePolicy,
    serializer: SerializerEnum,
    single_flight: Option<SingleFlight>,
    enable_metrics: bool,
}

/// 多层缓存构建器
pub struct MultiCacheBuilder {
    name: String,
    tiers: Vec<Tier>,
    write_policy: WritePolicy,
    serializer: SerializerEnum,
    coalesce_wrap: bool,
    enable_metrics: bool,
}

impl MultiCacheBuilder {
    /// 追加一层，追加顺序即读取优先级
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn tiers(mut self, tiers: impl IntoIterator<Item = Tier>) -> Self {
        self.tiers.extend(tiers);
        self
    }

    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn serializer(mut self, serializer: SerializerEnum) -> Self {
        self.serializer = serializer;
        self
    }

    /// 合并同一键上并发的 `wrap` 计算（默认关闭）
    pub fn coalesce_wrap(mut self, enabled: bool) -> Self {
        self.coalesce_wrap = enabled;
        self
    }

    pub fn enable_metrics(mut self, enabled: bool) -> Self {
        self.enable_metrics = enabled;
        self
    }

    pub fn build(self) -> MultiCache {
        MultiCache {
            inner: Arc::new(Inner {
                name: self.name,
                tiers: self.tiers,
                write_policy: self.write_policy,
                serializer: self.serializer,
                single_flight: self.coalesce_wrap.then(SingleFlight::new),
                enable_metrics: self.enable_metrics,
            }),
        }
    }
}

impl MultiCache {
    /// 使用默认选项创建多层缓存
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self::builder("default").tiers(tiers).build()
    }

    /// 创建构建器
    ///
    /// # 参数
    ///
    /// * `name` - 缓存名称，用于日志和指标
    pub fn builder(name: impl Into<String>) -> MultiCacheBuilder {
        MultiCacheBuilder {
            name: name.into(),
            tiers: Vec::new(),
            write_policy: WritePolicy::default(),
            serializer: SerializerEnum::default(),
            coalesce_wrap: false,
            enable_metrics: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.inner.tiers
    }

    /// 按名称查找层
    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.inner.tiers.iter().find(|t| t.name() == name)
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.inner.write_policy
    }

    pub fn serializer(&self) -> &SerializerEnum {
        &self.inner.serializer
    }

    fn record(&self, tier: &str, op: &str, result: &str) {
        if self.inner.enable_metrics {
            GLOBAL_METRICS.record_request(&self.inner.name, tier, op, result);
        }
    }

    fn record_duration(&self, tier: &str, op: &str, start: Instant) {
        if self.inner.enable_metrics {
            GLOBAL_METRICS.record_duration(
                &self.inner.name,
                tier,
                op,
                start.elapsed().as_secs_f64(),
            );
        }
    }

    /// 瀑布式探测：返回第一个命中的层下标和值
    ///
    /// 读取错误立即中止，不会被当作未命中跳过
    async fn probe(&self, key: &str) -> Result<Option<(usize, Vec<u8>)>> {
        for (index, tier) in self.inner.tiers.iter().enumerate() {
            let start = Instant::now();
            let result = tier.store().get(key).await;
            self.record_duration(tier.name(), "get", start);
            match result {
                Ok(Some(value)) => {
                    self.record(tier.name(), "get", "hit");
                    debug!("tier {} hit for key: {}", tier.name(), key);
                    return Ok(Some((index, value)));
                }
                Ok(None) => {
                    self.record(tier.name(), "get", "miss");
                }
                Err(e) => {
                    self.record(tier.name(), "get", "error");
                    return Err(CacheError::tier_read(tier.name(), e));
                }
            }
        }
        debug!("all {} tiers missed for key: {}", self.inner.tiers.len(), key);
        Ok(None)
    }

    /// 按写入策略执行一组层写入
    async fn run_writes<F>(&self, op: &str, writes: Vec<F>) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match self.inner.write_policy {
            WritePolicy::FailFast => try_join_all(writes).await.map(|_| ()),
            WritePolicy::AttemptAll => {
                let mut first_error = None;
                for result in join_all(writes).await {
                    if let Err(e) = result {
                        if first_error.is_none() {
                            first_error = Some(e);
                        } else {
                            warn!("{} on cache {} also failed: {}", op, self.inner.name, e);
                        }
                    }
                }
                first_error.map_or(Ok(()), Err)
            }
        }
    }

    /// 写入所有层，`ttl` 为空时每层使用自己的默认TTL
    async fn write_all(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let writes: Vec<_> = self
            .inner
            .tiers
            .iter()
            .map(|tier| async move {
                let start = Instant::now();
                let result = tier
                    .store()
                    .set(key, value.to_vec(), ttl.unwrap_or(tier.default_ttl()))
                    .await;
                self.record_duration(tier.name(), "set", start);
                match result {
                    Ok(()) => {
                        self.record(tier.name(), "set", "success");
                        Ok(())
                    }
                    Err(e) => {
                        self.record(tier.name(), "set", "error");
                        Err(CacheError::tier_write(tier.name(), e))
                    }
                }
            })
            .collect();
        self.run_writes("set", writes).await
    }

    /// 将命中值回填到命中层之前的所有层
    ///
    /// 每层使用自己的默认TTL；失败只记录日志，不影响调用结果
    async fn backfill(&self, key: &str, value: &[u8], hit_index: usize) {
        let writes = self.inner.tiers[..hit_index].iter().map(|tier| async move {
            let result = tier
                .store()
                .set(key, value.to_vec(), tier.default_ttl())
                .await;
            (tier, result)
        });
        for (tier, result) in join_all(writes).await {
            match result {
                Ok(()) => {
                    self.record(tier.name(), "backfill", "success");
                    debug!("backfilled key {} into tier {}", key, tier.name());
                }
                Err(e) => {
                    self.record(tier.name(), "backfill", "error");
                    warn!(
                        "backfill of key {} into tier {} failed: {}",
                        key,
                        tier.name(),
                        e
                    );
                }
            }
        }
    }

    /// 调用计算函数并记录指标
    async fn run_compute<F, Fut>(&self, compute: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<u8>>> + Send,
    {
        let start = Instant::now();
        let computed = compute().await;
        self.record_duration("compute", "compute", start);
        match &computed {
            Ok(_) => self.record("compute", "compute", "success"),
            Err(_) => self.record("compute", "compute", "error"),
        }
        computed
    }

    async fn compute_and_store<F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<Duration>,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<u8>>> + Send,
    {
        let value = self.run_compute(compute).await?;
        self.write_all(key, &value, ttl).await?;
        Ok(value)
    }

    /// 读取缓存值（字节）
    ///
    /// 按优先级探测各层，返回第一个命中的值，不会修改任何层
    #[instrument(skip(self), level = "debug", fields(cache = %self.inner.name))]
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.probe(key).await?.map(|(_, value)| value))
    }

    /// 写入缓存值（字节）到所有层
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    /// * `value` - 缓存值
    /// * `ttl` - 本次调用的TTL覆盖，None表示每层使用自己的默认值，`Duration::ZERO` 表示所有层永不过期
    #[instrument(skip(self, value), level = "debug", fields(cache = %self.inner.name))]
    pub async fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.write_all(key, &value, ttl).await
    }

    /// 从所有层删除缓存项
    #[instrument(skip(self), level = "debug", fields(cache = %self.inner.name))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        let deletes: Vec<_> = self
            .inner
            .tiers
            .iter()
            .map(|tier| async move {
                match tier.store().delete(key).await {
                    Ok(()) => {
                        self.record(tier.name(), "delete", "success");
                        Ok(())
                    }
                    Err(e) => {
                        self.record(tier.name(), "delete", "error");
                        Err(CacheError::tier_write(tier.name(), e))
                    }
                }
            })
            .collect();
        self.run_writes("delete", deletes).await
    }

    /// 读取或计算（字节）
    ///
    /// 1. 按顺序探测各层，读取错误立即返回，计算函数不会被调用
    /// 2. 在第 i 层命中时，回填第 0..i 层后返回
    /// 3. 全部未命中时调用 `compute` 一次，成功后写入所有层
    ///
    /// 计算函数的错误原样返回，此时不会写入任何层。
    #[instrument(skip(self, compute), level = "debug", fields(cache = %self.inner.name))]
    pub async fn wrap_bytes<F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<Duration>,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<u8>>> + Send,
    {
        if let Some((index, value)) = self.probe(key).await? {
            if index > 0 {
                self.backfill(key, &value, index).await;
            }
            return Ok(value);
        }

        let Some(flights) = &self.inner.single_flight else {
            return self.compute_and_store(key, compute, ttl).await;
        };

        match flights.join(key) {
            Flight::Leader(leader) => {
                // 先发布再写入，跟随者不必等待扇出写入完成
                let value = self.run_compute(compute).await?;
                leader.publish(&value);
                self.write_all(key, &value, ttl).await?;
                Ok(value)
            }
            Flight::Follower(mut rx) => {
                if let Some(value) = SingleFlight::wait(&mut rx).await {
                    self.record("compute", "compute", "coalesced");
                    return Ok(value);
                }
                debug!("in-flight compute for key {} gave no value, computing", key);
                self.compute_and_store(key, compute, ttl).await
            }
        }
    }

    /// 读取缓存值（带反序列化）
    #[instrument(skip(self), level = "debug", fields(cache = %self.inner.name))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_bytes(key).await? {
            Some(bytes) => Ok(Some(self.inner.serializer.deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// 写入缓存值（带序列化），值只序列化一次
    #[instrument(skip(self, value), level = "debug", fields(cache = %self.inner.name))]
    pub async fn set<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let bytes = self.inner.serializer.serialize(value)?;
        self.write_all(key, &bytes, ttl).await
    }

    /// 读取或计算（带序列化）
    ///
    /// 语义同 [`MultiCache::wrap_bytes`]；计算得到的值直接返回，不经过反序列化
    #[instrument(skip(self, compute), level = "debug", fields(cache = %self.inner.name))]
    pub async fn wrap<T, F, Fut>(&self, key: &str, compute: F, ttl: Option<Duration>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let serializer = &self.inner.serializer;
        let mut computed: Option<T> = None;
        let slot = &mut computed;
        let bytes = self
            .wrap_bytes(
                key,
                move || async move {
                    let value = compute().await?;
                    let bytes = serializer.serialize(&value)?;
                    *slot = Some(value);
                    Ok(bytes)
                },
                ttl,
            )
            .await?;
        match computed {
            Some(value) => Ok(value),
            None => serializer.deserialize(&bytes),
        }
    }
}

impl std::fmt::Debug for MultiCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiCache")
            .field("name", &self.inner.name)
            .field("tiers", &self.inner.tiers)
            .field("write_policy", &self.inner.write_policy)
            .field("coalesce_wrap", &self.inner.single_flight.is_some())
            .finish()
    }
}

/// 多层缓存本身也是一个存储，可以作为另一个多层缓存的一层。
/// 通过该接口的 `set` 把传入的TTL当作对所有层的覆盖。
#[async_trait]
impl Store for MultiCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get_bytes(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.set_bytes(key, value, Some(ttl)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        MultiCache::delete(self, key).await
    }
}

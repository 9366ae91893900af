//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了多层缓存的指标收集功能。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{span, Level};

/// 请求计数的标签组合
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    pub cache: String,
    pub tier: String,
    pub op: String,
    pub result: String,
}

/// 耗时统计的标签组合
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DurationKey {
    pub cache: String,
    pub tier: String,
    pub op: String,
}

/// 指标收集器
///
/// 按 (缓存, 层, 操作, 结果) 统计请求数，按 (缓存, 层, 操作) 累计耗时。
/// 标签分别存放，名称中可以包含任意字符。
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    pub requests_total: Arc<Mutex<HashMap<RequestKey, u64>>>,
    /// 操作耗时: (total_duration_secs, count)
    pub operation_duration: Arc<Mutex<HashMap<DurationKey, (f64, u64)>>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

// 指标只做累加，持锁线程 panic 后数据依然可用
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RequestKey {
    fn new(cache: &str, tier: &str, op: &str, result: &str) -> Self {
        Self {
            cache: cache.to_string(),
            tier: tier.to_string(),
            op: op.to_string(),
            result: result.to_string(),
        }
    }
}

impl DurationKey {
    fn new(cache: &str, tier: &str, op: &str) -> Self {
        Self {
            cache: cache.to_string(),
            tier: tier.to_string(),
            op: op.to_string(),
        }
    }
}

impl Metrics {
    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `cache` - 多层缓存名称
    /// * `tier` - 层名称，计算函数使用 "compute"
    /// * `op` - 操作类型（get/set/delete/backfill/compute）
    /// * `result` - 操作结果（hit/miss/error/success/coalesced）
    pub fn record_request(&self, cache: &str, tier: &str, op: &str, result: &str) {
        let span = span!(Level::TRACE, "cache_request", cache, tier, op, result);
        let _enter = span.enter();
        *lock(&self.requests_total)
            .entry(RequestKey::new(cache, tier, op, result))
            .or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, cache: &str, tier: &str, op: &str, duration_secs: f64) {
        let mut map = lock(&self.operation_duration);
        let entry = map
            .entry(DurationKey::new(cache, tier, op))
            .or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 读取某个请求计数，不存在时为0
    pub fn request_count(&self, cache: &str, tier: &str, op: &str, result: &str) -> u64 {
        lock(&self.requests_total)
            .get(&RequestKey::new(cache, tier, op, result))
            .copied()
            .unwrap_or(0)
    }
}

/// 转义 Prometheus 标签值中的反斜杠、双引号和换行
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// 获取指标字符串
///
/// 将所有指标格式化为Prometheus文本格式，按标签排序输出
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let mut reqs: Vec<(RequestKey, u64)> = lock(&metrics.requests_total)
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    let mut dur: Vec<(DurationKey, (f64, u64))> = lock(&metrics.operation_duration)
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    reqs.sort_by(|a, b| a.0.cmp(&b.0));
    dur.sort_by(|a, b| a.0.cmp(&b.0));

    let mut output = String::new();
    for (k, v) in &reqs {
        output.push_str(&format!(
            "tiercache_requests_total{{cache=\"{}\", tier=\"{}\", operation=\"{}\", result=\"{}\"}} {}\n",
            escape_label(&k.cache),
            escape_label(&k.tier),
            escape_label(&k.op),
            escape_label(&k.result),
            v
        ));
    }
    for (k, (total, count)) in &dur {
        let labels = format!(
            "cache=\"{}\", tier=\"{}\", operation=\"{}\"",
            escape_label(&k.cache),
            escape_label(&k.tier),
            escape_label(&k.op)
        );
        output.push_str(&format!(
            "tiercache_operation_duration_seconds_sum{{{}}} {}\n",
            labels, total
        ));
        output.push_str(&format!(
            "tiercache_operation_duration_seconds_count{{{}}} {}\n",
            labels, count
        ));
    }
    output
}

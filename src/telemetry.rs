//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志和链路追踪的初始化。

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// 初始化日志与 OpenTelemetry tracing
///
/// 应在应用启动时调用一次。日志级别取自 `RUST_LOG`，未设置时使用 `default_level`。
/// 未配置导出器的 tracer provider 不输出任何 span，接入导出器由应用层负责。
///
/// # 参数
///
/// * `service_name` - tracer 名称
/// * `default_level` - `RUST_LOG` 缺省时的过滤指令，例如 "info"
pub fn init_tracing(service_name: &str, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    // 应用可能已经设置了全局 subscriber
    let _ = tracing::subscriber::set_global_default(subscriber);
}

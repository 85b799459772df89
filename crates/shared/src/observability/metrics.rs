//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册游戏业务指标的 HELP 描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "game_operations_total",
        "Total number of exposed game operations"
    );
    metrics::describe_histogram!(
        "game_operation_duration_seconds",
        "Game operation duration in seconds"
    );

    metrics::describe_counter!(
        "game_cache_lookups_total",
        "Master data and token cache lookups by result"
    );

    metrics::describe_counter!("game_draws_total", "Total number of lottery draws");
    metrics::describe_counter!(
        "game_rewards_granted_total",
        "Total amount of rewards granted by kind"
    );
    metrics::describe_counter!(
        "game_token_consumptions_total",
        "One-time token consumption attempts by outcome"
    );
    metrics::describe_counter!(
        "game_presents_received_total",
        "Total number of presents received"
    );
    metrics::describe_counter!(
        "game_login_bonuses_total",
        "Total number of login bonus advances"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次对外操作
#[inline]
pub fn record_operation(operation: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "game_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "game_operation_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// 记录缓存命中情况
#[inline]
pub fn record_cache_lookup(cache: &str, hit: bool) {
    metrics::counter!(
        "game_cache_lookups_total",
        "cache" => cache.to_string(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

/// 记录抽卡
#[inline]
pub fn record_draw(gacha_id: i64, count: usize) {
    metrics::counter!("game_draws_total", "gacha_id" => gacha_id.to_string())
        .increment(count as u64);
}

/// 记录发放的奖励数量
#[inline]
pub fn record_reward_granted(kind: &str, amount: i64) {
    metrics::counter!("game_rewards_granted_total", "kind" => kind.to_string())
        .increment(amount.max(0) as u64);
}

/// 记录一次性令牌消费结果
#[inline]
pub fn record_token_consumption(kind: &str, outcome: &str) {
    metrics::counter!(
        "game_token_consumptions_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录领取的礼物数
#[inline]
pub fn record_presents_received(source: &str, count: usize) {
    metrics::counter!("game_presents_received_total", "source" => source.to_string())
        .increment(count as u64);
}

/// 记录登录奖励推进
#[inline]
pub fn record_login_bonus(looped: bool) {
    metrics::counter!("game_login_bonuses_total", "looped" => looped.to_string()).increment(1);
}

//! 可观测性模块
//!
//! 提供 Prometheus 指标、结构化日志和健康检查。

use axum::{Json, Router, response::IntoResponse, routing::get};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// ===== Simple Metrics (using atomics for zero-dep implementation) =====

/// 简单应用指标
#[derive(Clone, Default)]
pub struct AppMetrics {
    pub http_requests_total: Arc<AtomicU64>,
    pub search_requests_total: Arc<AtomicU64>,
    pub search_latency_sum: Arc<AtomicU64>,
    pub search_cache_hits: Arc<AtomicU64>,
    pub empty_result_searches: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self) {
        self.http_requests_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录搜索请求
    pub fn record_search(&self, duration_ms: u64, cache_hit: bool, result_count: usize) {
        self.search_requests_total.fetch_add(1, Ordering::SeqCst);
        self.search_latency_sum
            .fetch_add(duration_ms, Ordering::SeqCst);
        if cache_hit {
            self.search_cache_hits.fetch_add(1, Ordering::SeqCst);
        }
        if result_count == 0 {
            self.empty_result_searches.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 记录错误
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP http_requests_total Total HTTP requests
# TYPE http_requests_total counter
http_requests_total {}
# HELP search_requests_total Total search requests
# TYPE search_requests_total counter
search_requests_total {}
# HELP search_latency_seconds Search request latency in seconds
# TYPE search_latency_seconds histogram
search_latency_seconds_sum {}
search_latency_seconds_count {}
# HELP search_cache_hits_total Search response cache hits
# TYPE search_cache_hits_total counter
search_cache_hits_total {}
# HELP empty_result_searches_total Searches returning zero results
# TYPE empty_result_searches_total counter
empty_result_searches_total {}
# HELP errors_total Total errors
# TYPE errors_total counter
errors_total {}
"#,
            self.http_requests_total.load(Ordering::SeqCst),
            self.search_requests_total.load(Ordering::SeqCst),
            self.search_latency_sum.load(Ordering::SeqCst) as f64 / 1000.0,
            self.search_requests_total.load(Ordering::SeqCst),
            self.search_cache_hits.load(Ordering::SeqCst),
            self.empty_result_searches.load(Ordering::SeqCst),
            self.errors_total.load(Ordering::SeqCst),
        )
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub embedding_backend: String,
    pub corpus_backend: String,
}

/// 应用状态（用于健康检查）
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub start_time: DateTime<Utc>,
    pub version: String,
    pub embedding_backend: String,
    pub corpus_backend: String,
}

impl ObservabilityState {
    pub fn new(version: String, embedding_backend: String, corpus_backend: String) -> Self {
        Self {
            metrics: Arc::new(AppMetrics::default()),
            start_time: Utc::now(),
            version,
            embedding_backend,
            corpus_backend,
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

// ===== Handlers =====

/// 健康检查
pub async fn health_check(
    state: axum::extract::State<Arc<ObservabilityState>>,
) -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        embedding_backend: state.embedding_backend.clone(),
        corpus_backend: state.corpus_backend.clone(),
    })
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// Prometheus 指标端点
pub async fn metrics(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let output = state.metrics.gather();
    (axum::http::StatusCode::OK, output)
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/metrics", get(metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_gather_format() {
        let metrics = AppMetrics::default();
        metrics.record_search(120, false, 10);
        metrics.record_search(80, true, 0);

        let output = metrics.gather();
        assert!(output.contains("search_requests_total 2"));
        assert!(output.contains("search_cache_hits_total 1"));
        assert!(output.contains("empty_result_searches_total 1"));
        assert!(output.contains("search_latency_seconds_sum 0.2"));
    }

    #[test]
    fn test_uptime_non_negative() {
        let state = ObservabilityState::new("0.1.0".into(), "simple".into(), "static".into());
        assert!(state.uptime_seconds() >= 0.0);
    }
}

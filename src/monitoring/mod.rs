use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{error, info};

use crate::db::check_db_health;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: ServiceStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub backend: String,
    pub status: String,
    pub response_time_ms: Option<u64>,
    pub error: Option<String>,
}

static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

pub fn init_monitoring() {
    START_TIME.set(SystemTime::now()).ok();
    info!("🔍 Monitoring system initialized");
}

/// Health and metrics endpoints, no authentication
pub fn monitoring_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check_simple))
        .route("/health/detailed", get(health_check_detailed))
        .route("/metrics", get(prometheus_metrics))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Simple health check for load balancers
pub async fn health_check_simple() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": unix_now(),
    }))
}

/// Health check including a store round-trip
pub async fn health_check_detailed(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let uptime = START_TIME
        .get()
        .and_then(|start| SystemTime::now().duration_since(*start).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let store = match &state.db_pool {
        Some(pool) => {
            let start = Instant::now();
            match check_db_health(pool).await {
                Ok(()) => ServiceStatus {
                    backend: "postgres".to_string(),
                    status: "healthy".to_string(),
                    response_time_ms: Some(start.elapsed().as_millis() as u64),
                    error: None,
                },
                Err(e) => {
                    error!("❌ Database health check failed: {}", e);
                    ServiceStatus {
                        backend: "postgres".to_string(),
                        status: "unhealthy".to_string(),
                        response_time_ms: None,
                        error: Some("database unreachable".to_string()),
                    }
                }
            }
        }
        None => ServiceStatus {
            backend: "memory".to_string(),
            status: "healthy".to_string(),
            response_time_ms: Some(0),
            error: None,
        },
    };

    let healthy = store.status == "healthy";
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: unix_now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        store,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Prometheus text exposition of the default registry
pub async fn prometheus_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    (
        StatusCode::OK,
        [(CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

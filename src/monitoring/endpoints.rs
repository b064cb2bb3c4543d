use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::observability::metrics_handler;
use crate::state::AppState;

/// Create monitoring router with metrics and health endpoints
pub fn monitoring_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
}

/// Basic health check endpoint
async fn health_check() -> impl IntoResponse {
    let health = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "sheet_sync"
    });

    (StatusCode::OK, Json(health))
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub status: String,
    pub response_time_ms: Option<u64>,
    pub error: Option<String>,
}

/// Readiness: the destination store answers a ping.
async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.database.ping().await {
        Ok(elapsed) => ServiceStatus {
            status: "healthy".to_string(),
            response_time_ms: Some(elapsed.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            error!("Database readiness check failed: {}", e);
            ServiceStatus {
                status: "unhealthy".to_string(),
                response_time_ms: None,
                error: Some(e.to_string()),
            }
        }
    };

    let ready = database.status == "healthy";
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status = if ready { "ready" } else { "not_ready" };
    let body = serde_json::json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "database": database,
    });

    (status_code, Json(body))
}

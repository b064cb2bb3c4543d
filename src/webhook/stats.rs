use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::processing::PoolStatsSnapshot;
use crate::state::AppState;

/// Worker pool counters plus the configured limits.
#[derive(Debug, Serialize)]
pub struct WebhookStats {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub worker_pool: WorkerPoolStats,
    pub system_info: SystemInfo,
}

#[derive(Debug, Serialize)]
pub struct WorkerPoolStats {
    #[serde(flatten)]
    pub counters: PoolStatsSnapshot,
    pub workers: usize,
    pub queue_capacity: usize,
    pub utilization_percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub service_name: String,
    pub version: String,
}

/// GET /webhook-stats
pub async fn get_webhook_stats(State(state): State<Arc<AppState>>) -> Json<WebhookStats> {
    Json(collect_webhook_stats(&state))
}

fn collect_webhook_stats(state: &AppState) -> WebhookStats {
    let counters = state.batch_queue.stats().snapshot();
    let workers = state.worker_config.max_concurrent_batches;
    let utilization_percentage = if workers > 0 {
        (counters.in_flight as f64 / workers as f64) * 100.0
    } else {
        0.0
    };

    WebhookStats {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        worker_pool: WorkerPoolStats {
            counters,
            workers,
            queue_capacity: state.batch_queue.capacity(),
            utilization_percentage,
        },
        system_info: SystemInfo {
            service_name: "sheet_sync".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    }
}

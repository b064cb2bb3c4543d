use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod models;
pub mod monitoring;
pub mod observability;
pub mod processing;
pub mod services;
pub mod state;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

use monitoring::monitoring_router;
use state::AppState;
use webhook::create_webhook_router;

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Provider callbacks and worker pool stats
        .merge(create_webhook_router())
        // Health, readiness and Prometheus /metrics
        .merge(monitoring_router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers::post_webhook;
use super::stats::get_webhook_stats;

/// Creates the callback router: the provider posts every callback to `/`.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(post_webhook))
        .route("/webhook-stats", get(get_webhook_stats))
}

pub mod deduplication;
pub mod handlers;
pub mod routes;
pub mod stats;

pub use deduplication::{DedupKey, DedupScope};
pub use handlers::post_webhook;
pub use routes::create_webhook_router;
pub use stats::{get_webhook_stats, WebhookStats};

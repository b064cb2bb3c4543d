pub mod endpoints;
pub mod metrics;

pub use endpoints::metrics_handler;

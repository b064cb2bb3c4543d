// ============================================================================
// PROMETHEUS METRICS - Replication pipeline observability
// ============================================================================

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::time::Duration;

lazy_static! {
    /// Callbacks received, by classified payload kind
    pub static ref CALLBACKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sheet_sync_callbacks_total",
        "Total number of webhook callbacks received",
        &["kind"]
    )
    .unwrap();

    /// Events seen by the dispatcher, by event type and outcome
    pub static ref EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sheet_sync_events_total",
        "Total number of webhook events handled by the dispatcher",
        &["event_type", "outcome"]
    )
    .unwrap();

    /// Batches by final outcome (processed, rejected_scope, store_unavailable, dropped)
    pub static ref BATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sheet_sync_batches_total",
        "Total number of event batches",
        &["outcome"]
    )
    .unwrap();

    pub static ref BATCH_DURATION_SECONDS: Histogram = register_histogram!(
        "sheet_sync_batch_duration_seconds",
        "Time spent processing one event batch",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    /// Destination writes by operation and status
    pub static ref REPLICATION_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sheet_sync_replication_writes_total",
        "Total number of destination store writes",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref BATCHES_IN_FLIGHT: IntGauge = register_int_gauge!(
        "sheet_sync_batches_in_flight",
        "Number of batches currently being processed"
    )
    .unwrap();
}

pub fn record_callback(kind: &str) {
    CALLBACKS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_event(event_type: &str, outcome: &str) {
    EVENTS_TOTAL.with_label_values(&[event_type, outcome]).inc();
}

pub fn record_batch(outcome: &str, duration: Option<Duration>) {
    BATCHES_TOTAL.with_label_values(&[outcome]).inc();
    if let Some(duration) = duration {
        BATCH_DURATION_SECONDS.observe(duration.as_secs_f64());
    }
}

pub fn record_write(operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    REPLICATION_WRITES_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

use serde::Serialize;
use shared::AppError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::{
    EventBatch, EventType, ObjectType, ReplicationRecord, WebhookEvent, SHEET_SCOPE,
};
use crate::observability::metrics::{record_batch, record_event, record_write};
use crate::services::replication_service::{DestinationStore, DestinationWriter};
use crate::services::smartsheet_service::RowFetcher;
use crate::webhook::deduplication::{DedupKey, DedupScope};

/// Per-batch tally, logged when the batch completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub applied: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The batch was not bound to a sheet and was ignored as a whole.
    pub rejected: bool,
    /// No destination connection could be acquired; no event was attempted.
    pub store_unavailable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventOutcome {
    Applied,
    Duplicate,
    Skipped,
}

impl EventOutcome {
    fn as_str(self) -> &'static str {
        match self {
            EventOutcome::Applied => "applied",
            EventOutcome::Duplicate => "duplicate",
            EventOutcome::Skipped => "skipped",
        }
    }
}

/// Drives dedup, fetch and apply for every event of a batch, in order.
pub struct Dispatcher {
    fetcher: Arc<dyn RowFetcher>,
    store: Arc<dyn DestinationStore>,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<dyn RowFetcher>, store: Arc<dyn DestinationStore>) -> Self {
        Self { fetcher, store }
    }

    /// Processes a batch with a fresh dedup scope.
    pub async fn process_batch(&self, batch: EventBatch) -> BatchReport {
        let mut scope = DedupScope::new();
        self.process_batch_in_scope(batch, &mut scope).await
    }

    /// Processes a batch against a caller-owned dedup scope. Never fails:
    /// per-event errors are logged and the remaining events still run.
    pub async fn process_batch_in_scope(
        &self,
        batch: EventBatch,
        scope: &mut DedupScope,
    ) -> BatchReport {
        let span = info_span!(
            "batch",
            batch_id = %Uuid::new_v4(),
            scope = %batch.scope,
            scope_object_id = ?batch.scope_object_id,
            webhook_id = ?batch.webhook_id,
            events = batch.events.len()
        );
        self.run_batch(batch, scope).instrument(span).await
    }

    async fn run_batch(&self, batch: EventBatch, scope: &mut DedupScope) -> BatchReport {
        let mut report = BatchReport::default();

        if batch.scope != SHEET_SCOPE {
            info!("Ignoring batch with scope {:?}", batch.scope);
            record_batch("rejected_scope", None);
            report.rejected = true;
            return report;
        }

        let started = Instant::now();
        let mut writer = match self.store.connect().await {
            Ok(writer) => writer,
            Err(e) => {
                error!("Could not acquire destination connection, dropping batch: {}", e);
                record_batch("store_unavailable", None);
                report.store_unavailable = true;
                return report;
            }
        };

        for event in &batch.events {
            let event_type = event.event_type.as_str();
            match self.process_event(event, writer.as_mut(), scope).await {
                Ok(outcome) => {
                    record_event(event_type, outcome.as_str());
                    match outcome {
                        EventOutcome::Applied => report.applied += 1,
                        EventOutcome::Duplicate => report.duplicates += 1,
                        EventOutcome::Skipped => report.skipped += 1,
                    }
                }
                Err(e) => {
                    record_event(event_type, "failed");
                    report.failed += 1;
                    match &e {
                        AppError::NotFound { .. } => {
                            warn!("Row for {} event no longer exists, dropping: {}", event_type, e)
                        }
                        AppError::SourceUnavailable { .. } => {
                            error!("Error fetching row: {}", e)
                        }
                        AppError::MalformedPayload { .. } => {
                            error!("Error processing row data: {}", e)
                        }
                        _ => error!("Failed to apply {} event: {}", event_type, e),
                    }
                }
            }
        }

        // Return the connection to the pool before reporting.
        drop(writer);

        let elapsed = started.elapsed();
        info!(
            applied = report.applied,
            duplicates = report.duplicates,
            skipped = report.skipped,
            failed = report.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Batch complete"
        );
        record_batch("processed", Some(elapsed));
        report
    }

    async fn process_event(
        &self,
        event: &WebhookEvent,
        writer: &mut dyn DestinationWriter,
        scope: &mut DedupScope,
    ) -> Result<EventOutcome, AppError> {
        if event.object_type != ObjectType::Row {
            if let Some(problem) = &event.decode_error {
                debug!("Skipping undecodable non-row event: {}", problem);
            }
            return Ok(EventOutcome::Skipped);
        }
        if let Some(problem) = &event.decode_error {
            return Err(AppError::malformed(format!("invalid row event: {}", problem)));
        }
        if event.event_type == EventType::Other {
            debug!("Skipping unsupported row event {:?}", event);
            return Ok(EventOutcome::Skipped);
        }

        let row_id = event
            .row_id
            .ok_or_else(|| AppError::malformed("row event without an id"))?;
        info!("Row: {}, row id: {}", event.event_type.as_str(), row_id);

        match event.event_type {
            EventType::Deleted => {
                let result = writer.delete(row_id).await;
                record_write("delete", result.is_ok());
                result?;
                Ok(EventOutcome::Applied)
            }
            EventType::Created | EventType::Updated => {
                let snapshot = self.fetcher.fetch(row_id).await?;
                let key = DedupKey::from(&snapshot);
                if scope.seen(&key) {
                    info!("Row state {} already applied in this batch, skipping", key);
                    return Ok(EventOutcome::Duplicate);
                }
                scope.mark_seen(key);

                let record = ReplicationRecord::from_snapshot(&snapshot)?;
                let (operation, result) = if event.event_type == EventType::Created {
                    ("insert", writer.insert(&record).await)
                } else {
                    ("update", writer.update(&record).await)
                };
                record_write(operation, result.is_ok());
                result?;
                Ok(EventOutcome::Applied)
            }
            EventType::Other => Ok(EventOutcome::Skipped),
        }
    }
}

use shared::config::WorkerConfig;
use shared::DatabaseService;

use crate::processing::BatchQueue;

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub batch_queue: BatchQueue,
    pub database: DatabaseService,
    pub worker_config: WorkerConfig,
}

impl AppState {
    pub fn new(batch_queue: BatchQueue, database: DatabaseService, worker_config: WorkerConfig) -> Self {
        Self {
            batch_queue,
            database,
            worker_config,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State over a lazy pool that never connects unless queried.
    pub fn for_tests(
        queue_capacity: usize,
    ) -> (
        std::sync::Arc<Self>,
        tokio::sync::mpsc::Receiver<crate::models::EventBatch>,
    ) {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/sheet_sync_test")
            .unwrap();
        let (queue, receiver) = BatchQueue::new(queue_capacity);
        let state = Self::new(
            queue,
            DatabaseService::from_pool(pool),
            WorkerConfig {
                max_concurrent_batches: 1,
                queue_capacity,
            },
        );
        (std::sync::Arc::new(state), receiver)
    }
}

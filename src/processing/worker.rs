// ============================================================================
// BATCH WORKER POOL - Bounded queue between the callback handler and workers
// ============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::dispatcher::Dispatcher;
use crate::models::EventBatch;
use crate::observability::metrics::{record_batch, BATCHES_IN_FLIGHT};
use crate::webhook::deduplication::DedupScope;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("batch queue is full")]
    QueueFull,
    #[error("batch queue is closed")]
    Closed,
}

/// Counters shared by the queue and its workers.
#[derive(Debug, Default)]
pub struct PoolStats {
    queued: AtomicU64,
    in_flight: AtomicU64,
    completed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatsSnapshot {
    pub queued: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub dropped: u64,
}

impl PoolStats {
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn batch_started(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    fn batch_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sending half of the batch queue. Submission never blocks the caller.
#[derive(Debug, Clone)]
pub struct BatchQueue {
    sender: mpsc::Sender<EventBatch>,
    stats: Arc<PoolStats>,
    capacity: usize,
}

impl BatchQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EventBatch>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let queue = Self {
            sender,
            stats: Arc::new(PoolStats::default()),
            capacity,
        };
        (queue, receiver)
    }

    /// Enqueues a batch, or drops it when the queue is full or closed.
    pub fn submit(&self, batch: EventBatch) -> Result<(), SubmitError> {
        // Count before sending so a fast worker never sees queued underflow
        self.stats.queued.fetch_add(1, Ordering::Relaxed);

        match self.sender.try_send(batch) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stats.queued.fetch_sub(1, Ordering::Relaxed);
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                record_batch("dropped", None);
                match e {
                    mpsc::error::TrySendError::Full(_) => Err(SubmitError::QueueFull),
                    mpsc::error::TrySendError::Closed(_) => Err(SubmitError::Closed),
                }
            }
        }
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        self.stats.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Fixed set of workers draining the batch queue.
///
/// Each worker owns one [`DedupScope`] and resets it before every batch, so
/// batches are deduplicated independently and never share state.
pub struct BatchWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl BatchWorkerPool {
    pub fn start(
        dispatcher: Arc<Dispatcher>,
        receiver: mpsc::Receiver<EventBatch>,
        stats: Arc<PoolStats>,
        workers: usize,
    ) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..workers)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    dispatcher.clone(),
                    receiver.clone(),
                    stats.clone(),
                ))
            })
            .collect();

        info!("Started {} batch workers", workers);
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to exit. Workers stop once all queue senders
    /// are dropped and the remaining batches are drained.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Batch worker terminated abnormally: {}", e);
            }
        }
        info!("All batch workers stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    dispatcher: Arc<Dispatcher>,
    receiver: Arc<Mutex<mpsc::Receiver<EventBatch>>>,
    stats: Arc<PoolStats>,
) {
    let mut scope = DedupScope::new();

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(batch) = next else {
            break;
        };

        stats.batch_started();
        BATCHES_IN_FLIGHT.inc();
        scope.reset();

        // A panicking batch must not take the worker or the counters with it
        let dispatcher = dispatcher.clone();
        let task = tokio::spawn(async move {
            let report = dispatcher.process_batch_in_scope(batch, &mut scope).await;
            (scope, report)
        });
        scope = match task.await {
            Ok((returned, report)) => {
                debug!("Worker {} finished batch: {:?}", worker_id, report);
                returned
            }
            Err(e) => {
                error!("Worker {} lost a batch: {}", worker_id, e);
                record_batch("panicked", None);
                DedupScope::new()
            }
        };

        BATCHES_IN_FLIGHT.dec();
        stats.batch_finished();
    }

    debug!("Batch worker {} stopped", worker_id);
}

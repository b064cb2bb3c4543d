//! In-memory fetcher and store used by unit tests.

use async_trait::async_trait;
use shared::AppError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::{ReplicationRecord, RowId, RowSnapshot};
use crate::services::replication_service::{DestinationStore, DestinationWriter};
use crate::services::smartsheet_service::RowFetcher;

#[derive(Default)]
pub struct FakeFetcher {
    rows: Mutex<HashMap<u64, VecDeque<RowSnapshot>>>,
    unavailable: Mutex<HashSet<u64>>,
    panicking: Mutex<HashSet<u64>>,
    fetches: AtomicUsize,
    delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn snapshot(row_id: u64, version: i64, cells: &[&str]) -> RowSnapshot {
        RowSnapshot {
            row_id: RowId(row_id),
            version,
            cell_values: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Every fetch of `row_id` returns this state.
    pub fn set_row(&self, row_id: u64, version: i64, cells: &[&str]) {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(row_id, VecDeque::from([Self::snapshot(row_id, version, cells)]));
    }

    /// Successive fetches walk through queued states; the last one sticks.
    pub fn queue_row(&self, row_id: u64, version: i64, cells: &[&str]) {
        let mut rows = self.rows.lock().unwrap();
        rows.entry(row_id)
            .or_default()
            .push_back(Self::snapshot(row_id, version, cells));
    }

    pub fn set_source_error(&self, row_id: u64) {
        self.unavailable.lock().unwrap().insert(row_id);
    }

    /// Fetching `row_id` panics.
    pub fn panic_on(&self, row_id: u64) {
        self.panicking.lock().unwrap().insert(row_id);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches that were in progress at the same time.
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowFetcher for FakeFetcher {
    async fn fetch(&self, row_id: RowId) -> Result<RowSnapshot, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let panics = self.panicking.lock().unwrap().contains(&row_id.0);
        if panics {
            panic!("fetch of row {} blew up", row_id);
        }

        if let Some(delay) = self.delay {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }

        if self.unavailable.lock().unwrap().contains(&row_id.0) {
            return Err(AppError::source_unavailable("upstream returned 503"));
        }

        let mut rows = self.rows.lock().unwrap();
        let states = rows
            .get_mut(&row_id.0)
            .ok_or_else(|| AppError::not_found(format!("row {}", row_id)))?;
        if states.len() > 1 {
            states
                .pop_front()
                .ok_or_else(|| AppError::not_found(format!("row {}", row_id)))
        } else {
            states
                .front()
                .cloned()
                .ok_or_else(|| AppError::not_found(format!("row {}", row_id)))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Insert(Vec<String>),
    Update(Vec<String>),
    Delete(RowId),
}

#[derive(Default)]
pub struct FakeStore {
    writes: Arc<Mutex<Vec<Write>>>,
    failing_ids: Arc<Mutex<HashSet<String>>>,
    opened: AtomicUsize,
    open: Arc<AtomicUsize>,
    refuse: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    /// Inserts and updates for this correlation id fail.
    pub fn fail_writes_for(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn connections_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn connections_open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DestinationStore for FakeStore {
    async fn connect(&self) -> Result<Box<dyn DestinationWriter>, AppError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(AppError::configuration("destination refused connection"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeWriter {
            writes: self.writes.clone(),
            failing_ids: self.failing_ids.clone(),
            open: self.open.clone(),
        }))
    }
}

struct FakeWriter {
    writes: Arc<Mutex<Vec<Write>>>,
    failing_ids: Arc<Mutex<HashSet<String>>>,
    open: Arc<AtomicUsize>,
}

impl FakeWriter {
    fn check(&self, record: &ReplicationRecord) -> Result<(), AppError> {
        if self.failing_ids.lock().unwrap().contains(record.correlation_id()) {
            return Err(AppError::Write(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}

impl Drop for FakeWriter {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DestinationWriter for FakeWriter {
    async fn insert(&mut self, record: &ReplicationRecord) -> Result<(), AppError> {
        self.check(record)?;
        self.writes
            .lock()
            .unwrap()
            .push(Write::Insert(record.values().to_vec()));
        Ok(())
    }

    async fn update(&mut self, record: &ReplicationRecord) -> Result<(), AppError> {
        self.check(record)?;
        self.writes
            .lock()
            .unwrap()
            .push(Write::Update(record.values().to_vec()));
        Ok(())
    }

    async fn delete(&mut self, row_id: RowId) -> Result<(), AppError> {
        self.writes.lock().unwrap().push(Write::Delete(row_id));
        Ok(())
    }
}

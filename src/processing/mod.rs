pub mod dispatcher;
pub mod worker;

pub use dispatcher::{BatchReport, Dispatcher};
pub use worker::{BatchQueue, BatchWorkerPool, PoolStats, PoolStatsSnapshot, SubmitError};

//! Shared library for the sheet replication service
//!
//! Common functionality reused by the callback server and any tool that
//! talks to the same destination store:
//! - Configuration loading
//! - Error taxonomy
//! - Database pool service

pub mod config;
pub mod database;
pub mod error;

// Re-export commonly used types
pub use config::Config;
pub use database::DatabaseService;
pub use error::{AppError, Result};

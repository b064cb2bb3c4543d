//! Database service for the destination Postgres store

use crate::{config::DatabaseConfig, error::AppError, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: PgPool,
}

impl DatabaseService {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!(
            "Initializing database connection pool ({} max connections)",
            config.max_connections
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.max_lifetime_seconds))
            .test_before_acquire(true)
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::configuration(format!("Failed to connect to database: {}", e))
            })?;

        let service = Self { pool };

        // Test the connection
        service.ping().await.map_err(|e| {
            AppError::configuration(format!("Database health check failed: {}", e))
        })?;

        info!("Database connection pool initialized successfully");

        Ok(service)
    }

    /// Wraps an existing pool, e.g. one built lazily in tests.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips `SELECT 1` and returns the latency.
    pub async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(start.elapsed())
    }
}

//! Configuration management for the sheet replication service

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub smartsheet: SmartsheetConfig,
    pub webhook: WebhookConfig,
    pub worker: WorkerConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
    /// Destination table for replicated rows. Interpolated into SQL, so it is
    /// validated as a plain identifier.
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartsheetConfig {
    pub access_token: String,
    pub sheet_id: u64,
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    /// Public URL the provider should call back. Subscription bootstrap is
    /// skipped when unset.
    pub callback_url: Option<String>,
    pub bootstrap_delay_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub max_concurrent_batches: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. `from_env` is
    /// this with the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{} must be set", key))
        };
        let or_default = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let table = or_default("DESTINATION_TABLE", "account");
        if !is_sql_identifier(&table) {
            return Err(anyhow!(
                "DESTINATION_TABLE must be a plain SQL identifier, got {:?}",
                table
            ));
        }

        let worker = WorkerConfig {
            max_concurrent_batches: or_default("MAX_CONCURRENT_BATCHES", "4")
                .parse()
                .context("MAX_CONCURRENT_BATCHES")?,
            queue_capacity: or_default("BATCH_QUEUE_CAPACITY", "64")
                .parse()
                .context("BATCH_QUEUE_CAPACITY")?,
        };
        if worker.max_concurrent_batches == 0 || worker.queue_capacity == 0 {
            return Err(anyhow!(
                "MAX_CONCURRENT_BATCHES and BATCH_QUEUE_CAPACITY must be greater than zero"
            ));
        }

        Ok(Config {
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: or_default("DATABASE_MAX_CONNECTIONS", "10")
                    .parse()
                    .context("DATABASE_MAX_CONNECTIONS")?,
                min_connections: or_default("DATABASE_MIN_CONNECTIONS", "1")
                    .parse()
                    .context("DATABASE_MIN_CONNECTIONS")?,
                acquire_timeout_seconds: or_default("DATABASE_ACQUIRE_TIMEOUT_SECONDS", "30")
                    .parse()
                    .context("DATABASE_ACQUIRE_TIMEOUT_SECONDS")?,
                idle_timeout_seconds: or_default("DATABASE_IDLE_TIMEOUT_SECONDS", "600")
                    .parse()
                    .context("DATABASE_IDLE_TIMEOUT_SECONDS")?,
                max_lifetime_seconds: or_default("DATABASE_MAX_LIFETIME_SECONDS", "1800")
                    .parse()
                    .context("DATABASE_MAX_LIFETIME_SECONDS")?,
                table,
            },
            smartsheet: SmartsheetConfig {
                access_token: required("SMARTSHEET_ACCESS_TOKEN")?,
                sheet_id: required("SMARTSHEET_SHEET_ID")?
                    .parse()
                    .context("SMARTSHEET_SHEET_ID")?,
                api_base_url: or_default(
                    "SMARTSHEET_API_BASE_URL",
                    "https://api.smartsheet.com/2.0",
                )
                .trim_end_matches('/')
                .to_string(),
                request_timeout_seconds: or_default("SMARTSHEET_REQUEST_TIMEOUT_SECONDS", "30")
                    .parse()
                    .context("SMARTSHEET_REQUEST_TIMEOUT_SECONDS")?,
            },
            webhook: WebhookConfig {
                name: or_default("WEBHOOK_NAME", "sheet_sync"),
                callback_url: lookup("WEBHOOK_CALLBACK_URL").filter(|v| !v.trim().is_empty()),
                bootstrap_delay_seconds: or_default("WEBHOOK_BOOTSTRAP_DELAY_SECONDS", "1")
                    .parse()
                    .context("WEBHOOK_BOOTSTRAP_DELAY_SECONDS")?,
            },
            worker,
            app: AppConfig {
                port: or_default("PORT", "3000").parse().context("PORT")?,
                log_level: or_default("RUST_LOG", "info"),
            },
        })
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

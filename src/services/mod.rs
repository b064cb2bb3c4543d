// ============================================================================
// SMARTSHEET SOURCE
// ============================================================================
pub mod smartsheet_service;
pub mod subscription_service;

pub use smartsheet_service::{RowFetcher, SheetRowFetcher, SmartsheetClient};
pub use subscription_service::{bootstrap_subscription, ensure_webhook};

// ============================================================================
// DESTINATION STORE
// ============================================================================
pub mod replication_service;

pub use replication_service::{DestinationStore, DestinationWriter, PgDestinationStore};

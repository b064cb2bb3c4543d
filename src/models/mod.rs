pub mod row;
pub mod smartsheet;
pub mod webhook;

pub use row::{ReplicationRecord, RowSnapshot, DATA_COLUMN_COUNT, DESTINATION_COLUMNS};
pub use webhook::{
    CallbackPayload, EventBatch, EventType, ObjectType, RowId, VerificationResponse,
    WebhookEvent, SHEET_SCOPE,
};

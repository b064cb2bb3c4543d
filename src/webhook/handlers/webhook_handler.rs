use crate::models::{CallbackPayload, VerificationResponse};
use crate::observability::metrics::record_callback;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use shared::AppError;
use std::sync::Arc;
use tracing::{error, info};

/// POST / - single callback endpoint for handshakes, events and status changes.
///
/// Event batches are handed to the worker pool and acknowledged with an
/// empty 200 before any of them is processed.
pub async fn post_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match handle_callback(&state, &body) {
        Ok(response) => response,
        Err(e) => {
            record_callback("malformed");
            e.into_response()
        }
    }
}

fn handle_callback(state: &AppState, body: &[u8]) -> Result<Response, AppError> {
    let body: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::malformed(format!("callback body is not valid JSON: {}", e)))?;

    let payload = CallbackPayload::classify(body)?;
    record_callback(payload.kind());

    match payload {
        CallbackPayload::Verification { challenge } => {
            info!("Received verification challenge");
            Ok(Json(VerificationResponse {
                smartsheet_hook_response: challenge,
            })
            .into_response())
        }
        CallbackPayload::EventBatch(batch) => {
            info!(
                "Received callback with {} events at {}",
                batch.events.len(),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
            if let Err(e) = state.batch_queue.submit(batch) {
                error!("Dropping event batch: {}", e);
            }
            Ok(StatusCode::OK.into_response())
        }
        CallbackPayload::StatusChange {
            new_status,
            webhook_id,
        } => {
            info!("Webhook {:?} status changed to {}", webhook_id, new_status);
            Ok(StatusCode::OK.into_response())
        }
        CallbackPayload::Unknown(body) => {
            info!("Received unrecognized callback: {}", body);
            Ok(StatusCode::OK.into_response())
        }
    }
}

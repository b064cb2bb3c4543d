//! Error handling for the replication pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Upstream spreadsheet API failed (network, auth, rate limit, 5xx).
    #[error("Source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// The row vanished between the event and the fetch.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Destination store failure: constraint violation, connectivity loss.
    #[error("Write error: {0}")]
    Write(#[from] sqlx::Error),

    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Unclassifiable callbacks are answered with a 500
            AppError::MalformedPayload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Write(_) => "WRITE_ERROR",
            AppError::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            AppError::Configuration { .. } => "CONFIG_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse {
            error: self.error_code().to_string(),
            message: format!("Error: {}", self),
            code: status.as_u16().to_string(),
            details: None,
        };

        tracing::error!("API Error: {} - {}", self.error_code(), self);

        (status, Json(error_response)).into_response()
    }
}

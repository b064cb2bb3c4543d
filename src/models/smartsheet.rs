//! Wire types of the Smartsheet REST API (only the fields we use).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(default)]
    pub value: Option<Value>,
}

impl Cell {
    /// Stringified, trimmed cell value. Empty cells become `""` so the
    /// position of every following cell is preserved.
    pub fn text(&self) -> String {
        match &self.value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string().trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: u64,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub permalink: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub scope_object_id: Option<u64>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookList {
    #[serde(default)]
    pub data: Vec<Webhook>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookRequest {
    pub name: String,
    pub callback_url: String,
    pub scope: String,
    pub scope_object_id: u64,
    pub events: Vec<String>,
    pub version: u32,
}

impl CreateWebhookRequest {
    /// Subscription to every event on one sheet.
    pub fn for_sheet(name: &str, callback_url: &str, sheet_id: u64) -> Self {
        Self {
            name: name.to_string(),
            callback_url: callback_url.to_string(),
            scope: super::webhook::SHEET_SCOPE.to_string(),
            scope_object_id: sheet_id,
            events: vec!["*.*".to_string()],
            version: 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebhookRequest {
    pub callback_url: String,
    pub enabled: bool,
}

/// Envelope of create/update responses.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope<T> {
    pub result: T,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

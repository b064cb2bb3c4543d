use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::AppError;
use std::fmt;

/// Identifier the spreadsheet service assigns to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scope value of callbacks bound to a single sheet.
pub const SHEET_SCOPE: &str = "sheet";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Row,
    #[serde(other)]
    #[default]
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
    #[serde(other)]
    #[default]
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Updated => "updated",
            EventType::Deleted => "deleted",
            EventType::Other => "other",
        }
    }
}

/// One change notification inside a callback.
///
/// Cell and column events carry `rowId`/`columnId` instead of `id`, so `id`
/// is optional here and only required for row events.
///
/// Decoding never fails: a field of the wrong type is recorded in
/// `decode_error` and only that event is rejected by the dispatcher.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct WebhookEvent {
    pub object_type: ObjectType,
    pub event_type: EventType,
    #[serde(rename = "id")]
    pub row_id: Option<RowId>,
    #[serde(skip)]
    pub decode_error: Option<String>,
}

impl WebhookEvent {
    pub fn row(event_type: EventType, row_id: u64) -> Self {
        Self {
            object_type: ObjectType::Row,
            event_type,
            row_id: Some(RowId(row_id)),
            decode_error: None,
        }
    }
}

impl From<Value> for WebhookEvent {
    fn from(value: Value) -> Self {
        let mut event = WebhookEvent {
            object_type: ObjectType::Other,
            event_type: EventType::Other,
            row_id: None,
            decode_error: None,
        };

        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                event.decode_error =
                    Some(format!("event must be a JSON object, got {}", json_kind(&other)));
                return event;
            }
        };

        let mut errors = Vec::new();
        event.object_type = decode_label(&fields, "objectType", &mut errors);
        event.event_type = decode_label(&fields, "eventType", &mut errors);
        event.row_id = match fields.get("id") {
            None => None,
            Some(id) => match id.as_u64() {
                Some(id) => Some(RowId(id)),
                None => {
                    errors.push(format!("id must be an unsigned integer, got {}", json_kind(id)));
                    None
                }
            },
        };

        if !errors.is_empty() {
            event.decode_error = Some(errors.join("; "));
        }
        event
    }
}

/// Decodes a lowercase label; an absent key is the default, anything but a
/// string is an error.
fn decode_label<T>(fields: &Map<String, Value>, key: &str, errors: &mut Vec<String>) -> T
where
    T: DeserializeOwned + Default,
{
    match fields.get(key) {
        None => T::default(),
        Some(Value::String(label)) => {
            serde_json::from_value(Value::String(label.clone())).unwrap_or_default()
        }
        Some(other) => {
            errors.push(format!("{} must be a string, got {}", key, json_kind(other)));
            T::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    #[serde(default)]
    pub scope: String,
    pub events: Vec<WebhookEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_object_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl EventBatch {
    pub fn new(scope: impl Into<String>, events: Vec<WebhookEvent>) -> Self {
        Self {
            scope: scope.into(),
            events,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VerificationResponse {
    #[serde(rename = "smartsheetHookResponse")]
    pub smartsheet_hook_response: Value,
}

/// Inbound callback, classified once by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackPayload {
    /// Verification handshake; the token is echoed back verbatim.
    Verification { challenge: Value },
    EventBatch(EventBatch),
    StatusChange {
        new_status: String,
        webhook_id: Option<u64>,
    },
    Unknown(Value),
}

impl CallbackPayload {
    /// Precedence: `challenge`, then `events`, then `newWebHookStatus`.
    pub fn classify(body: Value) -> Result<Self, AppError> {
        let mut fields = match body {
            Value::Object(fields) => fields,
            other => {
                return Err(AppError::malformed(format!(
                    "callback body must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        if let Some(challenge) = fields.remove("challenge") {
            return Ok(CallbackPayload::Verification { challenge });
        }

        if fields.contains_key("events") {
            let batch = serde_json::from_value::<EventBatch>(Value::Object(fields))
                .map_err(|e| AppError::malformed(format!("invalid event callback: {}", e)))?;
            return Ok(CallbackPayload::EventBatch(batch));
        }

        if let Some(status) = fields.get("newWebHookStatus") {
            let new_status = match status {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let webhook_id = fields.get("webhookId").and_then(Value::as_u64);
            return Ok(CallbackPayload::StatusChange {
                new_status,
                webhook_id,
            });
        }

        Ok(CallbackPayload::Unknown(Value::Object(fields)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CallbackPayload::Verification { .. } => "verification",
            CallbackPayload::EventBatch(_) => "events",
            CallbackPayload::StatusChange { .. } => "status",
            CallbackPayload::Unknown(_) => "unknown",
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// SMARTSHEET SERVICE - Row fetches and webhook subscription management
// ============================================================================

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{config::SmartsheetConfig, AppError};
use std::time::Duration;
use tracing::{debug, info};

use crate::models::smartsheet::{
    ApiErrorBody, CreateWebhookRequest, ResultEnvelope, Row, Sheet, UpdateWebhookRequest,
    Webhook, WebhookList,
};
use crate::models::{RowId, RowSnapshot};

/// Retrieves the current state of a source row.
#[async_trait]
pub trait RowFetcher: Send + Sync {
    /// Fails with `SourceUnavailable` when the upstream call errors and with
    /// `NotFound` when the row no longer exists.
    async fn fetch(&self, row_id: RowId) -> Result<RowSnapshot, AppError>;
}

#[derive(Clone)]
pub struct SmartsheetClient {
    http_client: Client,
    base_url: String,
    access_token: String,
}

impl SmartsheetClient {
    pub fn new(config: &SmartsheetConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(
            http_client,
            &config.api_base_url,
            &config.access_token,
        ))
    }

    pub fn with_client(http_client: Client, base_url: &str, access_token: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// GET /sheets/{sheetId}/rows/{rowId}
    pub async fn get_row(&self, sheet_id: u64, row_id: RowId) -> Result<RowSnapshot, AppError> {
        let url = format!("{}/sheets/{}/rows/{}", self.base_url, sheet_id, row_id);
        let resource = format!("row {} of sheet {}", row_id, sheet_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::source_unavailable(format!("fetching {}: {}", resource, e)))?;

        let row: Row = decode(check_status(response, &resource).await?, &resource).await?;
        debug!("Fetched {} (version {}, {} cells)", resource, row.version, row.cells.len());

        Ok(RowSnapshot {
            row_id: RowId(row.id),
            version: row.version,
            cell_values: row.cells.iter().map(|cell| cell.text()).collect(),
        })
    }

    /// Startup probe: fetches the sheet header with a single-row page.
    pub async fn get_sheet(&self, sheet_id: u64) -> Result<Sheet, AppError> {
        let url = format!("{}/sheets/{}?pageSize=1", self.base_url, sheet_id);
        self.get_json(&url, &format!("sheet {}", sheet_id)).await
    }

    /// Every webhook owned by the token's user.
    pub async fn list_webhooks(&self) -> Result<Vec<Webhook>, AppError> {
        let url = format!("{}/webhooks?includeAll=true", self.base_url);
        let list: WebhookList = self.get_json(&url, "webhook list").await?;
        Ok(list.data)
    }

    pub async fn create_webhook(&self, request: &CreateWebhookRequest) -> Result<Webhook, AppError> {
        let url = format!("{}/webhooks", self.base_url);
        let resource = format!("webhook {:?}", request.name);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::source_unavailable(format!("creating {}: {}", resource, e)))?;

        let envelope: ResultEnvelope<Webhook> =
            decode(check_status(response, &resource).await?, &resource).await?;
        info!("Created webhook {} ({})", envelope.result.id, envelope.result.name);
        Ok(envelope.result)
    }

    pub async fn update_webhook(
        &self,
        webhook_id: u64,
        request: &UpdateWebhookRequest,
    ) -> Result<Webhook, AppError> {
        let url = format!("{}/webhooks/{}", self.base_url, webhook_id);
        let resource = format!("webhook {}", webhook_id);

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::source_unavailable(format!("updating {}: {}", resource, e)))?;

        let envelope: ResultEnvelope<Webhook> =
            decode(check_status(response, &resource).await?, &resource).await?;
        Ok(envelope.result)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, resource: &str) -> Result<T, AppError> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::source_unavailable(format!("fetching {}: {}", resource, e)))?;

        decode(check_status(response, resource).await?, resource).await
    }
}

/// Maps 404 to `NotFound` and any other failure status to `SourceUnavailable`.
async fn check_status(response: Response, resource: &str) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&error_body)
        .ok()
        .and_then(|body| match (body.error_code, body.message) {
            (Some(code), Some(message)) => Some(format!("{} (code {})", message, code)),
            (None, Some(message)) => Some(message),
            _ => None,
        })
        .unwrap_or(error_body);

    if status == StatusCode::NOT_FOUND {
        return Err(AppError::not_found(format!("{}: {}", resource, detail)));
    }

    Err(AppError::source_unavailable(format!(
        "{} returned {}: {}",
        resource, status, detail
    )))
}

async fn decode<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T, AppError> {
    response
        .json::<T>()
        .await
        .map_err(|e| AppError::source_unavailable(format!("invalid response for {}: {}", resource, e)))
}

/// Row fetcher bound to the one replicated sheet.
#[derive(Clone)]
pub struct SheetRowFetcher {
    client: SmartsheetClient,
    sheet_id: u64,
}

impl SheetRowFetcher {
    pub fn new(client: SmartsheetClient, sheet_id: u64) -> Self {
        Self { client, sheet_id }
    }
}

#[async_trait]
impl RowFetcher for SheetRowFetcher {
    async fn fetch(&self, row_id: RowId) -> Result<RowSnapshot, AppError> {
        self.client.get_row(self.sheet_id, row_id).await
    }
}

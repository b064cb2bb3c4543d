// ============================================================================
// SUBSCRIPTION SERVICE - Registers and enables the sheet webhook at startup
// ============================================================================

use shared::{config::WebhookConfig, AppError};
use std::time::Duration;
use tracing::{error, info, warn};

use super::smartsheet_service::SmartsheetClient;
use crate::models::smartsheet::{CreateWebhookRequest, UpdateWebhookRequest, Webhook};

/// Finds the webhook named `name` on `sheet_id`, creating it when absent,
/// then points it at `callback_url` and enables it.
///
/// Enabling makes the provider send the verification challenge, so the
/// callback listener must already be accepting requests.
pub async fn ensure_webhook(
    client: &SmartsheetClient,
    sheet_id: u64,
    name: &str,
    callback_url: &str,
) -> Result<Webhook, AppError> {
    let existing = client
        .list_webhooks()
        .await?
        .into_iter()
        .find(|hook| hook.scope_object_id == Some(sheet_id) && hook.name == name);

    let webhook = match existing {
        Some(hook) => {
            info!("Found existing webhook {} ({})", hook.id, hook.name);
            hook
        }
        None => {
            info!("No webhook named {:?} on sheet {}, creating one", name, sheet_id);
            client
                .create_webhook(&CreateWebhookRequest::for_sheet(name, callback_url, sheet_id))
                .await?
        }
    };

    let updated = client
        .update_webhook(
            webhook.id,
            &UpdateWebhookRequest {
                callback_url: callback_url.to_string(),
                enabled: true,
            },
        )
        .await?;

    info!(
        "Webhook {} enabled: {}, status: {}",
        updated.id,
        updated.enabled,
        updated.status.as_deref().unwrap_or("unknown")
    );
    Ok(updated)
}

/// Background bootstrap run once the listener is bound. Failures are
/// logged; the service keeps serving callbacks either way.
pub async fn bootstrap_subscription(client: SmartsheetClient, sheet_id: u64, config: WebhookConfig) {
    let Some(callback_url) = config.callback_url else {
        info!("WEBHOOK_CALLBACK_URL not set, skipping webhook registration");
        return;
    };

    tokio::time::sleep(Duration::from_secs(config.bootstrap_delay_seconds)).await;

    match ensure_webhook(&client, sheet_id, &config.name, &callback_url).await {
        Ok(hook) if !hook.enabled => {
            warn!("Webhook {} is registered but not enabled", hook.id)
        }
        Ok(_) => {}
        Err(e) => error!("Webhook registration failed: {}", e),
    }
}

/// Delivery-provider webhook
///
/// ```text
/// POST /api/webhooks/resend
/// x-resend-signature: <hex hmac-sha256 of the raw body>
///
/// { "type": "email.delivered", "created_at": "...", "data": { "email_id": "..." } }
/// ```
///
/// Checks run in a fixed order: signature header present, secret configured,
/// signature matches, payload well formed, event type known. Only then is a
/// single delivery update written.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use chrono::Utc;
use outreach_shared::webhook::{parse_event, verify_signature, SIGNATURE_HEADER};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
    pub handled: bool,
}

pub async fn resend_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing signature".to_string()))?;

    let secret = state
        .config
        .resend
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::InternalError("RESEND_WEBHOOK_SECRET is not configured".to_string()))?;

    if !verify_signature(secret, &body, signature) {
        tracing::warn!("Webhook signature mismatch");
        return Err(ApiError::Forbidden("Invalid signature".to_string()));
    }

    let event = parse_event(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let Some(update) = event.delivery_update(Utc::now()) else {
        tracing::info!(event_type = %event.event_type, "Unhandled webhook event type");
        return Ok(Json(WebhookAck {
            received: true,
            handled: false,
        }));
    };

    let updated = state.store.update_delivery(&event.email_id, update).await?;
    if updated == 0 {
        tracing::warn!(
            provider_email_id = %event.email_id,
            status = update.status.as_str(),
            "Webhook matched no email record"
        );
    } else {
        tracing::debug!(
            provider_email_id = %event.email_id,
            status = update.status.as_str(),
            "Delivery status updated"
        );
    }

    Ok(Json(WebhookAck {
        received: true,
        handled: true,
    }))
}

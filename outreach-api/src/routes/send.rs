/// Immediate send endpoint
///
/// ```text
/// POST /api/send
///
/// {
///   "senderName": "Ada Lovelace",
///   "from": "ada@gmail.com",
///   "to": "grace@example.com, alan@example.com",
///   "subject": "Hello",
///   "html": "<p>Hi</p>",
///   "cc": ["charles@example.com"],
///   "attachments": [{ "filename": "notes.txt", "content": "aGk=" }],
///   "userId": "uuid"
/// }
/// ```
///
/// The `from` address keeps its local part and is moved onto the configured
/// sending domain. With a `userId` the send is gated on the `resend` quota
/// and recorded in usage and history.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::schedule::parse_user_id,
};
use axum::{extract::State, Json};
use outreach_shared::{
    models::email_record::NewEmailRecord,
    provider::{format_from, sending_address, Attachment, OutgoingEmail, RecipientList},
    quota::ActionKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendRequest {
    pub sender_name: String,
    pub from: String,
    pub to: RecipientList,
    pub subject: String,
    pub html: String,
    pub cc: RecipientList,
    pub attachments: Vec<Attachment>,
    pub user_id: Option<String>,
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    /// Provider email id
    pub id: String,
}

/// Sends an email through the delivery provider
///
/// # Errors
///
/// - `400`: no recipients, or a `userId` that is not a valid id
/// - `403`: the sender's resend quota is exhausted
/// - `500`: the provider rejected the email; its message is returned
pub async fn send_email(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> ApiResult<Json<SendResponse>> {
    let to = req.to.normalize();
    if to.is_empty() {
        return Err(ApiError::BadRequest("At least one recipient is required".to_string()));
    }

    let sender_id = match req.user_id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => None,
        Some(raw) => Some(
            parse_user_id(Some(raw))
                .ok_or_else(|| ApiError::BadRequest("Invalid user ID".to_string()))?,
        ),
    };

    if let Some(sender_id) = sender_id {
        let decision = state.quota.check_kind(sender_id, ActionKind::Resend, None).await?;
        if !decision.can_proceed {
            return Err(ApiError::Forbidden(decision.message.unwrap_or_default()));
        }
    }

    let address = sending_address(&req.from, &state.config.resend.sending_domain);
    let email = OutgoingEmail {
        from: format_from(&req.sender_name, &address),
        to,
        cc: req.cc.normalize(),
        subject: req.subject,
        html: req.html,
        attachments: req.attachments,
    };

    let receipt = state.email.send(&email).await?;
    tracing::info!(
        provider_email_id = %receipt.id,
        recipients = email.to.len(),
        "Email sent"
    );

    if let Some(sender_id) = sender_id {
        state.usage.record_resend_request(sender_id).await;

        let history = NewEmailRecord {
            sender_id,
            provider_email_id: receipt.id.clone(),
            recipient: email.to.join(", "),
            subject: email.subject.clone(),
            template_id: req.template_id,
        };
        if let Err(e) = state.store.insert_email_record(history).await {
            tracing::error!(
                sender_id = %sender_id,
                provider_email_id = %receipt.id,
                error = %e,
                "Failed to record email history"
            );
        }
    }

    Ok(Json(SendResponse { id: receipt.id }))
}

/// Scheduled email endpoints
///
/// - `POST /api/schedule` - queue one email per recipient for later delivery
/// - `GET /api/scheduled` - pending emails of the session sender
/// - `DELETE /api/scheduled/:id` - cancel a pending email
///
/// Queued rows are picked up by the worker once `scheduledAt` has passed.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use outreach_shared::{
    auth::middleware::AuthContext,
    models::scheduled_email::{NewScheduledEmail, Priority, ScheduledEmail},
    provider::RecipientList,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleRequest {
    pub user_id: Option<String>,
    pub recipients: RecipientList,
    pub subject: Option<String>,
    pub body: Option<String>,

    /// RFC 3339 timestamp
    pub schedule_at: Option<String>,

    /// `low`, `normal` (default) or `high`
    pub priority: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ScheduledListResponse {
    pub scheduled: Vec<ScheduledEmail>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses `userId`, treating blank and malformed ids alike
pub(crate) fn parse_user_id(value: Option<&str>) -> Option<Uuid> {
    non_blank(value).and_then(|v| Uuid::parse_str(v).ok())
}

/// Queues an email per recipient
///
/// # Errors
///
/// - `401`: `userId` missing or not a known sender
/// - `400`: no recipients, blank subject or body, `scheduleAt` missing,
///   malformed or not in the future
/// - `500`: any insert failed; rows already inserted are kept
pub async fn schedule_emails(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<Json<ScheduleResponse>> {
    let sender_id = parse_user_id(req.user_id.as_deref())
        .ok_or_else(|| ApiError::Unauthorized("User ID is required".to_string()))?;

    let recipients = req.recipients.normalize();
    if recipients.is_empty() {
        return Err(ApiError::BadRequest("At least one recipient is required".to_string()));
    }

    let subject = non_blank(req.subject.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Subject is required".to_string()))?;
    let body = non_blank(req.body.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Body is required".to_string()))?;

    let schedule_at = non_blank(req.schedule_at.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Schedule time is required".to_string()))?;
    let scheduled_at = DateTime::parse_from_rfc3339(schedule_at)
        .map_err(|_| ApiError::BadRequest("Invalid schedule time".to_string()))?
        .with_timezone(&Utc);
    if scheduled_at <= Utc::now() {
        return Err(ApiError::BadRequest("Schedule time must be in the future".to_string()));
    }

    let priority = match non_blank(req.priority.as_deref()) {
        None => Priority::default(),
        Some(p) => Priority::from_str(p)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid priority: {}", p)))?,
    };

    if state.store.find_sender(sender_id).await?.is_none() {
        return Err(ApiError::Unauthorized("Unknown user".to_string()));
    }

    let inserts = recipients.iter().map(|recipient| {
        state.store.insert_scheduled_email(NewScheduledEmail {
            sender_id,
            recipient: recipient.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
            scheduled_at,
            priority,
        })
    });

    let results = join_all(inserts).await;
    let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    if !failures.is_empty() {
        for e in &failures {
            tracing::error!(sender_id = %sender_id, error = %e, "Scheduled email insert failed");
        }
        return Err(ApiError::Failure("Failed to schedule emails".to_string()));
    }

    let count = results.len();
    tracing::info!(sender_id = %sender_id, count, %scheduled_at, "Emails scheduled");

    Ok(Json(ScheduleResponse {
        message: format!("Scheduled {} email(s)", count),
        count,
    }))
}

pub async fn list_scheduled(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ScheduledListResponse>> {
    let scheduled = state.store.list_pending_scheduled(auth.sender_id).await?;
    Ok(Json(ScheduledListResponse { scheduled }))
}

pub async fn cancel_scheduled(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_scheduled(auth.sender_id, id).await? {
        return Err(ApiError::NotFound("Scheduled email not found".to_string()));
    }

    tracing::info!(sender_id = %auth.sender_id, scheduled_email_id = %id, "Scheduled email cancelled");
    Ok(StatusCode::NO_CONTENT)
}

/// Plan and usage endpoints
///
/// - `GET /api/usage` - sender, plan and counters of the session sender
/// - `POST /api/usage/check` - quota decision for one action

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::schedule::parse_user_id,
};
use axum::{extract::State, Extension, Json};
use outreach_shared::{
    auth::middleware::AuthContext,
    models::{plan::Plan, sender::Sender, usage::Usage},
    quota::QuotaDecision,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub sender: Sender,
    pub plan: Plan,
    pub usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuotaCheckRequest {
    pub user_id: Option<String>,

    /// `ai`, `resend`, `contact`, `template` or `storage`
    pub action: String,

    /// Bytes about to be stored, for `storage`
    pub value: Option<i64>,
}

/// # Errors
///
/// - `401`: no session
/// - `404`: sender, plan or usage record missing
pub async fn get_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UsageResponse>> {
    let not_found = || ApiError::NotFound("Usage data not found".to_string());

    let sender = state.store.find_sender(auth.sender_id).await?.ok_or_else(not_found)?;
    let plan = state.store.find_plan(auth.sender_id).await?.ok_or_else(not_found)?;
    let usage = state.store.find_usage(auth.sender_id).await?.ok_or_else(not_found)?;

    Ok(Json(UsageResponse { sender, plan, usage }))
}

/// Advisory check; denials are 200 responses with `canProceed: false`
pub async fn check_quota(
    State(state): State<AppState>,
    Json(req): Json<QuotaCheckRequest>,
) -> ApiResult<Json<QuotaDecision>> {
    let sender_id = parse_user_id(req.user_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("User ID is required".to_string()))?;

    let decision = state.quota.check(sender_id, req.action.trim(), req.value).await?;
    Ok(Json(decision))
}

/// Text generation proxy
///
/// ```text
/// POST /api/ai/generate
///
/// { "userId": "uuid", "prompt": "Write a follow-up email", "system": "Be brief" }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::schedule::parse_user_id,
};
use axum::{extract::State, Json};
use outreach_shared::{provider::ProviderError, quota::ActionKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateRequest {
    pub user_id: Option<String>,
    pub prompt: String,
    pub system: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
}

/// # Errors
///
/// - `401`: no `userId`
/// - `400`: blank prompt
/// - `403`: AI quota exhausted
/// - `500`: provider not configured or failing
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let sender_id = parse_user_id(req.user_id.as_deref())
        .ok_or_else(|| ApiError::Unauthorized("User ID is required".to_string()))?;

    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("Prompt is required".to_string()));
    }

    let decision = state.quota.check_kind(sender_id, ActionKind::Ai, None).await?;
    if !decision.can_proceed {
        return Err(ApiError::Forbidden(decision.message.unwrap_or_default()));
    }

    let provider = state
        .ai
        .as_ref()
        .ok_or(ProviderError::NotConfigured("AI provider"))?;

    let system = req.system.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let text = provider.complete(system, prompt).await?;

    state.usage.record_ai_request(sender_id).await;
    tracing::debug!(sender_id = %sender_id, chars = text.len(), "Completion generated");

    Ok(Json(GenerateResponse { text }))
}

/// Email template endpoints
///
/// - `GET /api/templates` - templates of the session sender, newest first
/// - `POST /api/templates` - create a template
/// - `DELETE /api/templates/:id` - delete a template
///
/// Creating a template counts against both the `template` and the `storage`
/// quota (content byte length).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use outreach_shared::{
    auth::middleware::AuthContext,
    models::template::{normalize_tags, NewTemplate, Template},
    quota::ActionKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 998, message = "Subject must be 1-998 characters"))]
    pub subject: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<Template>,
}

pub async fn list_templates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TemplateListResponse>> {
    let templates = state.store.list_templates(auth.sender_id).await?;
    Ok(Json(TemplateListResponse { templates }))
}

/// # Errors
///
/// - `422`: blank name, subject or content
/// - `404`: `categoryId` is not one of the sender's categories
/// - `403`: template count or storage quota exhausted
pub async fn create_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(mut req): Json<CreateTemplateRequest>,
) -> ApiResult<(StatusCode, Json<Template>)> {
    req.name = req.name.trim().to_string();
    req.subject = req.subject.trim().to_string();
    req.validate()?;

    let sender_id = auth.sender_id;
    let bytes = req.content.len() as i64;

    if let Some(category_id) = req.category_id {
        if state.store.find_category(sender_id, category_id).await?.is_none() {
            return Err(ApiError::NotFound("Category not found".to_string()));
        }
    }

    let decision = state.quota.check_kind(sender_id, ActionKind::Template, None).await?;
    if !decision.can_proceed {
        return Err(ApiError::Forbidden(decision.message.unwrap_or_default()));
    }

    let decision = state
        .quota
        .check_kind(sender_id, ActionKind::Storage, Some(bytes))
        .await?;
    if !decision.can_proceed {
        return Err(ApiError::Forbidden(decision.message.unwrap_or_default()));
    }

    let template = state
        .store
        .create_template(NewTemplate {
            sender_id,
            category_id: req.category_id,
            name: req.name,
            subject: req.subject,
            content: req.content,
            tags: normalize_tags(&req.tags),
        })
        .await?;

    state.usage.record_template_created(sender_id).await;
    state.usage.record_storage(sender_id, template.content_bytes()).await;

    tracing::info!(sender_id = %sender_id, template_id = %template.id, "Template created");

    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_template(auth.sender_id, id).await? {
        return Err(ApiError::NotFound("Template not found".to_string()));
    }

    state.usage.record_template_deleted(auth.sender_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Template categories
///
/// - `GET /api/categories`
/// - `POST /api/categories` - `{ "name": "Follow-ups" }`, 409 on a duplicate name

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use outreach_shared::{auth::middleware::AuthContext, models::template::Category};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CategoryListResponse>> {
    let categories = state.store.list_categories(auth.sender_id).await?;
    Ok(Json(CategoryListResponse { categories }))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(mut req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    req.name = req.name.trim().to_string();
    req.validate()?;

    let category = state.store.create_category(auth.sender_id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

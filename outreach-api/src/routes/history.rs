/// Sent-email history and delivery analytics
///
/// - `GET /api/history?limit=50` - latest history records (1-200)
/// - `GET /api/analytics` - status counts and engagement rates

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use outreach_shared::{
    auth::middleware::AuthContext,
    models::email_record::{EmailRecord, EmailStats},
};
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub emails: Vec<EmailRecord>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    #[serde(flatten)]
    pub stats: EmailStats,

    /// Share of emails whose latest status is opened or clicked
    pub open_rate: f64,

    pub click_rate: f64,
}

impl AnalyticsResponse {
    pub fn from_stats(stats: EmailStats) -> Self {
        let rate = |n: i64| {
            if stats.total == 0 {
                0.0
            } else {
                n as f64 / stats.total as f64
            }
        };

        Self {
            open_rate: rate(stats.opened + stats.clicked),
            click_rate: rate(stats.clicked),
            stats,
        }
    }
}

pub async fn list_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let emails = state.store.list_email_records(auth.sender_id, limit).await?;
    Ok(Json(HistoryResponse { emails }))
}

pub async fn analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AnalyticsResponse>> {
    let stats = state.store.email_stats(auth.sender_id).await?;
    Ok(Json(AnalyticsResponse::from_stats(stats)))
}

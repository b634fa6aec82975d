//! Ranked list endpoints

use super::error::ApiError;
use super::user::UserId;
use crate::engine::ScoredEntry;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use orion_common::db::Comparison;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub entries: Vec<ScoredEntry>,
    /// Entry with a ranking session in progress, if any
    pub ranking: Option<Uuid>,
}

/// GET /api/list
pub async fn get_list(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<ListResponse>, ApiError> {
    let entries = state.engine.list_view(user.as_str()).await?;
    let ranking = state.sessions.peek(user.as_str()).await.map(|s| s.entry_id);
    Ok(Json(ListResponse { entries, ranking }))
}

/// DELETE /api/list/:entry_id
pub async fn remove_entry(
    State(state): State<AppState>,
    user: UserId,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.engine.remove_entry(user.as_str(), entry_id).await?;
    state.sessions.clear_for_entry(user.as_str(), entry_id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub comparisons: Vec<Comparison>,
}

/// GET /api/comparisons?limit=N
pub async fn get_comparisons(
    State(state): State<AppState>,
    user: UserId,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let comparisons = state
        .engine
        .comparison_history(user.as_str(), query.limit)
        .await?;
    Ok(Json(HistoryResponse { comparisons }))
}

//! Ranking session endpoints
//!
//! The user's session slot stays locked for the whole request. The stored
//! session is only replaced when the engine succeeds.

use super::error::ApiError;
use super::user::UserId;
use crate::engine::SessionView;
use crate::session::Verdict;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// POST /api/rank/:entry_id/start
pub async fn start(
    State(state): State<AppState>,
    user: UserId,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let mut slot = state.sessions.lock(user.as_str()).await;
    let step = state
        .engine
        .start_ranking(user.as_str(), entry_id, *slot)
        .await?;
    *slot = step.session;
    Ok(Json(step.view))
}

#[derive(Debug, Deserialize)]
pub struct TierRequest {
    pub tier: String,
}

/// POST /api/rank/:entry_id/tier
pub async fn set_tier(
    State(state): State<AppState>,
    user: UserId,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<TierRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let mut slot = state.sessions.lock(user.as_str()).await;
    let step = state
        .engine
        .set_tier_str(user.as_str(), entry_id, &request.tier, *slot)
        .await?;
    *slot = step.session;
    Ok(Json(step.view))
}

#[derive(Debug, Deserialize)]
pub struct VerdictRequest {
    pub verdict: Verdict,
    /// Candidate the user was shown; stale verdicts are discarded
    pub candidate_id: Uuid,
}

/// POST /api/rank/:entry_id/verdict
pub async fn submit_verdict(
    State(state): State<AppState>,
    user: UserId,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<VerdictRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let mut slot = state.sessions.lock(user.as_str()).await;
    let stored = *slot;
    let step = state
        .engine
        .submit_verdict(user.as_str(), entry_id, request.verdict, request.candidate_id, stored)
        .await?;

    // A verdict for another entry must not discard that entry's session
    if stored.map_or(true, |s| s.matches(entry_id)) {
        *slot = step.session;
    }
    Ok(Json(step.view))
}

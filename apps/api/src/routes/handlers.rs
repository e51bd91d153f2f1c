use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::ats::AtsResult;
use crate::errors::AppError;
use crate::jobs::BudgetStatus;
use crate::models::recommendation::{RankFilters, RecommendationSet};
use crate::models::resume::{AnalysisPayload, ExperienceLevel};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub text: String,
    #[serde(default)]
    pub experience_level: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    pub user_id: Uuid,
    pub resume_id: Uuid,
    pub analysis: AnalysisPayload,
    #[serde(default)]
    pub filters: RankFilters,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub query: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// POST /api/v1/resumes/score
pub async fn handle_score_resume(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<AtsResult>, AppError> {
    let level = req
        .experience_level
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ExperienceLevel::parse_lenient);
    Ok(Json(state.service.score_resume(&req.text, level).await))
}

/// POST /api/v1/recommendations
pub async fn handle_rank_jobs(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<RecommendationSet>, AppError> {
    let set = state
        .service
        .rank_jobs(req.user_id, req.resume_id, req.analysis, req.filters)
        .await?;
    Ok(Json(set))
}

/// GET /api/v1/recommendations/:user_id
pub async fn handle_get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<RecommendationSet>, AppError> {
    let limit = params.limit.unwrap_or(state.config.max_results);
    if limit == 0 {
        return Err(AppError::Validation("limit must be at least 1".to_string()));
    }
    let set = state.service.stored_recommendations(user_id, limit).await?;
    Ok(Json(set))
}

/// POST /api/v1/jobs/refresh
pub async fn handle_refresh_jobs(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    let location = req.location.as_deref().map(str::trim).filter(|l| !l.is_empty());
    state.service.refresh_cache(&req.query, location).await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/jobs/budget
pub async fn handle_budget_status(State(state): State<AppState>) -> Json<BudgetStatus> {
    Json(state.service.budget_status())
}

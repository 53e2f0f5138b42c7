use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ranking::orchestrator::{RankRequest, ScoreEntry};
use crate::ranking::weights::{parse_weights, CategoryWeights, WeightSource};
use crate::ranking::Criteria;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ScoresQuery {
    #[serde(default)]
    pub include_fit: bool,
    pub criteria: Option<String>,
}

#[derive(Serialize)]
pub struct ScoresResponse {
    pub results: Vec<ScoreEntry>,
    pub criteria: Criteria,
    pub generated_at: DateTime<Utc>,
}

/// GET /resumes/scores
/// Criteria is checked before weights, and weights before the resume list.
pub async fn handle_get_scores(
    State(state): State<AppState>,
    Query(params): Query<ScoresQuery>,
) -> Result<Json<ScoresResponse>, AppError> {
    let criteria: Criteria = params.criteria.as_deref().unwrap_or("keyword").parse()?;
    let (weights, _) = state.weights.load().await?;
    let resumes = state.resumes.list().await?;

    let results = state
        .ranker
        .rank(RankRequest {
            resumes,
            weights,
            include_fitness_gate: params.include_fit,
            criteria,
        })
        .await?;

    Ok(Json(ScoresResponse {
        results,
        criteria,
        generated_at: Utc::now(),
    }))
}

#[derive(Deserialize)]
pub struct SetWeightsRequest {
    pub weights: BTreeMap<String, f64>,
}

#[derive(Serialize)]
pub struct WeightsResponse {
    pub weights: CategoryWeights,
    pub source: WeightSource,
}

/// POST /weights
pub async fn handle_set_weights(
    State(state): State<AppState>,
    Json(req): Json<SetWeightsRequest>,
) -> Result<Json<WeightsResponse>, AppError> {
    let weights = parse_weights(&req.weights)?;
    state.weights.save(&weights).await?;
    Ok(Json(WeightsResponse {
        weights,
        source: WeightSource::File,
    }))
}

/// GET /weights
pub async fn handle_get_weights(
    State(state): State<AppState>,
) -> Result<Json<WeightsResponse>, AppError> {
    let (weights, source) = state.weights.load().await?;
    Ok(Json(WeightsResponse { weights, source }))
}

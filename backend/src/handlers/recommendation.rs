//! HTTP handlers for stateless crop scoring

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use shared::{
    resolve_location, validate_snapshot, ClimateSnapshot, ConfidenceBand, CropRecommendation,
    CropScoringEngine, DomainError, PlantIdentificationHint,
};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// A recommendation with its presentation badges
#[derive(Debug, Serialize)]
pub struct RecommendationCard {
    #[serde(flatten)]
    pub recommendation: CropRecommendation,
    pub confidence_band: ConfidenceBand,
    pub rank_label: String,
}

impl From<CropRecommendation> for RecommendationCard {
    fn from(recommendation: CropRecommendation) -> Self {
        Self {
            confidence_band: recommendation.confidence_band(),
            rank_label: recommendation.rank_label(),
            recommendation,
        }
    }
}

pub fn to_cards(recommendations: Vec<CropRecommendation>) -> Vec<RecommendationCard> {
    recommendations.into_iter().map(RecommendationCard::from).collect()
}

/// Request to score a climate snapshot directly
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub snapshot: ClimateSnapshot,
    pub hint: Option<PlantIdentificationHint>,
    pub top_n: Option<usize>,
    #[serde(default)]
    pub full: bool,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub knowledge_base_version: String,
    pub recommendations: Vec<RecommendationCard>,
}

/// Score a supplied snapshot and optional hint against the catalog
pub async fn score_recommendations(
    State(state): State<AppState>,
    Json(mut request): Json<ScoreRequest>,
) -> AppResult<Json<ScoreResponse>> {
    // The location deserializes straight into decimals, so range-check it here
    let location = &request.snapshot.location;
    let location = resolve_location(
        location.latitude.to_string(),
        location.longitude.to_string(),
        location.label.clone(),
    )?;
    request.snapshot.location = location;

    // A caller-supplied snapshot is user input, not an upstream violation
    validate_snapshot(&request.snapshot).map_err(|err| match err {
        DomainError::ClimateDataInvalid { field, message, .. } => {
            AppError::Validation { field, message }
        }
        other => other.into(),
    })?;

    let engine = CropScoringEngine::new(&state.knowledge);
    let recommendations = if request.full {
        engine.score_full(&request.snapshot, request.hint.as_ref())
    } else {
        let top_n = request.top_n.unwrap_or(state.config.session.top_n);
        engine.recommend(&request.snapshot, request.hint.as_ref(), Some(top_n))
    };

    Ok(Json(ScoreResponse {
        knowledge_base_version: state.knowledge.version.clone(),
        recommendations: to_cards(recommendations),
    }))
}

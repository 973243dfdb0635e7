//! HTTP handlers for recommendation sessions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{resolve_location, PlantPhoto, RawCoordinate, SessionStatus};
use uuid::Uuid;

use super::recommendation::{to_cards, RecommendationCard};
use crate::error::AppResult;
use crate::services::SessionView;
use crate::AppState;

/// Start a new recommendation session
pub async fn create_session(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<SessionView>)> {
    let session = state.sessions.create().await;
    Ok((StatusCode::CREATED, Json(session.view())))
}

/// Get the current state of a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(session_id).await?;
    Ok(Json(session.view()))
}

/// Farm location as captured by GPS or manual entry
#[derive(Debug, Deserialize)]
pub struct LocationInput {
    pub latitude: RawCoordinate,
    pub longitude: RawCoordinate,
    pub label: Option<String>,
}

/// Submit or replace the farm location
pub async fn submit_location(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(input): Json<LocationInput>,
) -> AppResult<Json<SessionView>> {
    let location = resolve_location(input.latitude, input.longitude, input.label)?;
    let session = state.sessions.get(session_id).await?;
    session.submit_location(location)?;
    Ok(Json(session.view()))
}

/// Submit or replace the plant photo
pub async fn submit_photo(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(photo): Json<PlantPhoto>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(session_id).await?;
    session.submit_photo(photo)?;
    Ok(Json(session.view()))
}

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    #[serde(default)]
    pub full: bool,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub recommendations: Vec<RecommendationCard>,
}

/// Produce recommendations, waiting for pending inputs
pub async fn run_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<RunQuery>,
) -> AppResult<Json<RunResponse>> {
    let session = state.sessions.get(session_id).await?;
    let recommendations = if query.full {
        session.run_full().await?
    } else {
        session.run().await?
    };

    Ok(Json(RunResponse {
        session_id,
        status: session.status(),
        recommendations: to_cards(recommendations),
    }))
}

/// Cancel and discard a session
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.take(session_id).await?;
    Ok(Json(session.view()))
}

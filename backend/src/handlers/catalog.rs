//! HTTP handlers for the crop catalog

use axum::{extract::State, Json};
use serde::Serialize;
use shared::CropProfile;

use crate::AppState;

#[derive(Serialize)]
pub struct CatalogResponse {
    pub version: String,
    pub crops: Vec<CropProfile>,
}

/// List the crops the engine can recommend
pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        version: state.knowledge.version.clone(),
        crops: state.knowledge.crops.clone(),
    })
}

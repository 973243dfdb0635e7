//! HTTP handlers for climate conditions

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{resolve_location, ClimateSnapshot, FarmLocation, RegionPreset};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Query parameters for climate conditions
///
/// Either a coordinate pair or the name of a region preset.
#[derive(Debug, Deserialize)]
pub struct ClimateQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub region: Option<String>,
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct RegionsResponse {
    pub regions: Vec<RegionPreset>,
}

/// Get the climate snapshot for a location
pub async fn get_climate(
    State(state): State<AppState>,
    Query(query): Query<ClimateQuery>,
) -> AppResult<Json<ClimateSnapshot>> {
    let location = query_location(&state, query.region, query.latitude, query.longitude)?;
    let snapshot = state.climate.fetch(&location, query.as_of).await?;
    Ok(Json(snapshot))
}

/// List the region presets a farmer can pick instead of typing coordinates
pub async fn list_regions(State(state): State<AppState>) -> Json<RegionsResponse> {
    Json(RegionsResponse {
        regions: state.knowledge.regions.clone(),
    })
}

fn query_location(
    state: &AppState,
    region: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
) -> AppResult<FarmLocation> {
    match region {
        Some(name) => {
            let preset = state.knowledge.region(&name).ok_or_else(|| AppError::Validation {
                field: "region".to_string(),
                message: format!("unknown region {}", name.trim()),
            })?;
            Ok(preset.location()?)
        }
        // A missing coordinate is reported the same way as a blank one
        None => Ok(resolve_location(
            latitude.unwrap_or_default(),
            longitude.unwrap_or_default(),
            None,
        )?),
    }
}

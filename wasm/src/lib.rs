//! WebAssembly module for the Crop Advisor front end
//!
//! Runs the recommendation core in the browser so a farmer can get
//! suggestions from a cached climate snapshot while offline:
//! - Coordinate validation for GPS and manual entry
//! - Crop scoring against the bundled knowledge base
//! - Presentation badges for confidence and rank

use serde::Serialize;
use shared::{
    resolve_location, validate_snapshot, ClimateSnapshot, ConfidenceBand, CropScoringEngine,
    KnowledgeBase, PlantIdentificationHint, RawCoordinate,
};
use wasm_bindgen::prelude::*;

pub use shared::models::*;
pub use shared::types::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("crop advisor core loaded"));
}

fn js_error(message: String) -> JsValue {
    js_sys::Error::new(&message).into()
}

#[derive(Serialize)]
struct ResolvedLocation {
    latitude: String,
    longitude: String,
    display_name: String,
}

fn resolve(latitude: &str, longitude: &str) -> Result<String, String> {
    let location = resolve_location(coordinate(latitude), coordinate(longitude), None)
        .map_err(|e| e.to_string())?;
    let resolved = ResolvedLocation {
        latitude: location.latitude.to_string(),
        longitude: location.longitude.to_string(),
        display_name: location.display_name(),
    };
    serde_json::to_string(&resolved).map_err(|e| e.to_string())
}

/// Manual entry fields hand us text; numbers from the GPS API are
/// stringified by the caller, so both go through the same parser
fn coordinate(raw: &str) -> RawCoordinate {
    RawCoordinate::Text(raw.to_string())
}

/// Validate a coordinate pair, returning the normalized location as JSON
#[wasm_bindgen]
pub fn resolve_farm_location(latitude: &str, longitude: &str) -> Result<String, JsValue> {
    resolve(latitude, longitude).map_err(js_error)
}

fn recommend(snapshot_json: &str, hint_json: Option<String>, top_n: Option<usize>) -> Result<String, String> {
    let mut snapshot: ClimateSnapshot = serde_json::from_str(snapshot_json)
        .map_err(|e| format!("Invalid snapshot JSON: {}", e))?;
    let location = &snapshot.location;
    let location = resolve_location(
        location.latitude.to_string(),
        location.longitude.to_string(),
        location.label.clone(),
    )
    .map_err(|e| e.to_string())?;
    snapshot.location = location;
    validate_snapshot(&snapshot).map_err(|e| e.to_string())?;

    let hint: Option<PlantIdentificationHint> = hint_json
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(serde_json::from_str::<PlantIdentificationHint>)
        .transpose()
        .map_err(|e| format!("Invalid hint JSON: {}", e))?;

    let kb = KnowledgeBase::builtin().map_err(|e| e.to_string())?;
    let recommendations = CropScoringEngine::new(&kb).recommend(&snapshot, hint.as_ref(), top_n);
    serde_json::to_string(&recommendations).map_err(|e| e.to_string())
}

/// Rank crops for a climate snapshot and optional identification hint
///
/// Returns the recommendations as a JSON array. `top_n` defaults to the
/// knowledge base's configured count.
#[wasm_bindgen]
pub fn recommend_crops(
    snapshot_json: &str,
    hint_json: Option<String>,
    top_n: Option<u32>,
) -> Result<String, JsValue> {
    recommend(snapshot_json, hint_json, top_n.map(|n| n as usize)).map_err(js_error)
}

/// Band for a confidence value: "high", "medium" or "low"
#[wasm_bindgen]
pub fn confidence_band(confidence: u8) -> String {
    ConfidenceBand::from_confidence(confidence).to_string()
}

/// Badge text for a rank position
#[wasm_bindgen]
pub fn rank_label(rank: u32) -> String {
    shared::rank_label(rank)
}

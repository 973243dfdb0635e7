//! Climate data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FarmLocation;

/// Raw reading as returned by an upstream climate data source,
/// before bounds validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f64,
    pub rainfall_mm: f64,
    pub humidity_pct: f64,
    pub wind_kph: f64,
    pub uv_index: f64,
    pub ndvi: f64,
    pub observed_at: DateTime<Utc>,
}

/// A validated point-in-time climate measurement bundle for a location
///
/// Versioned by `observed_at`: of two snapshots for the same location the
/// one observed later supersedes the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClimateSnapshot {
    pub temperature_c: f64,
    pub rainfall_mm: f64,
    pub humidity_pct: f64,
    pub wind_kph: f64,
    pub uv_index: f64,
    pub ndvi: f64,
    pub observed_at: DateTime<Utc>,
    pub location: FarmLocation,
}

impl ClimateSnapshot {
    /// Whether this snapshot supersedes `other` for the same location
    pub fn is_newer_than(&self, other: &ClimateSnapshot) -> bool {
        self.observed_at > other.observed_at
    }
}

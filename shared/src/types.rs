//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Inclusive numeric range, e.g. an ideal temperature band
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn half_width(&self) -> f64 {
        (self.max - self.min) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl std::fmt::Display for ValueRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}–{}", self.min, self.max)
    }
}

/// Relative irrigation need of a crop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaterRequirement {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for WaterRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaterRequirement::Low => write!(f, "Low"),
            WaterRequirement::Moderate => write!(f, "Moderate"),
            WaterRequirement::High => write!(f, "High"),
        }
    }
}

/// A coordinate as captured by the front end: either a JSON number or
/// the raw text of a manual entry field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawCoordinate {
    Number(f64),
    Text(String),
}

impl From<f64> for RawCoordinate {
    fn from(value: f64) -> Self {
        RawCoordinate::Number(value)
    }
}

impl From<&str> for RawCoordinate {
    fn from(value: &str) -> Self {
        RawCoordinate::Text(value.to_string())
    }
}

impl From<String> for RawCoordinate {
    fn from(value: String) -> Self {
        RawCoordinate::Text(value)
    }
}

/// Plant photo submitted for identification, base64 encoded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantPhoto {
    pub image_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

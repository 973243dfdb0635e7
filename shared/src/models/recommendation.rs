//! Crop recommendation models

use serde::{Deserialize, Serialize};

use crate::types::WaterRequirement;

/// Weak evidence from the plant identification service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantIdentificationHint {
    pub species_guess: String,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

impl PlantIdentificationHint {
    pub fn new(species_guess: impl Into<String>, confidence: f64) -> Self {
        Self {
            species_guess: species_guess.into(),
            confidence,
        }
    }

    /// Confidence clamped into [0, 1]; NaN counts as no confidence
    pub fn effective_confidence(&self) -> f64 {
        if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        }
    }
}

/// Result of asking the identification service about a photo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IdentificationOutcome {
    Identified(PlantIdentificationHint),
    Unidentified,
}

impl IdentificationOutcome {
    pub fn into_hint(self) -> Option<PlantIdentificationHint> {
        match self {
            IdentificationOutcome::Identified(hint) => Some(hint),
            IdentificationOutcome::Unidentified => None,
        }
    }
}

/// Per-factor sub-scores as integer percents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FactorScores {
    pub temperature: u8,
    pub rainfall: u8,
    pub soil: u8,
    pub vegetation: u8,
    pub identification: u8,
}

/// A single ranked crop recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropRecommendation {
    pub crop_name: String,
    /// Suitability 0-100; not a probability
    pub confidence: u8,
    /// 1-based position, 1 = best
    pub rank: u32,
    pub rationale: String,
    pub planting_window: String,
    pub harvest_window: String,
    pub water_requirement: WaterRequirement,
    pub inferred_soil_type: String,
    pub companion_crops: Vec<String>,
    pub benefits: Vec<String>,
    pub factors: FactorScores,
}

impl CropRecommendation {
    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::from_confidence(self.confidence)
    }

    pub fn rank_label(&self) -> String {
        rank_label(self.rank)
    }
}

/// Coarse confidence grouping used when rendering a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// 80 and above
    High,
    /// 60-79
    Medium,
    /// Below 60
    Low,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            80..=u8::MAX => ConfidenceBand::High,
            60..=79 => ConfidenceBand::Medium,
            _ => ConfidenceBand::Low,
        }
    }
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceBand::High => write!(f, "high"),
            ConfidenceBand::Medium => write!(f, "medium"),
            ConfidenceBand::Low => write!(f, "low"),
        }
    }
}

/// Badge text for a rank position
pub fn rank_label(rank: u32) -> String {
    match rank {
        1 => "Best Match".to_string(),
        2 => "Great Option".to_string(),
        3 => "Good Choice".to_string(),
        n => format!("#{} Option", n),
    }
}

//! Crop knowledge base models
//!
//! The knowledge base is versioned configuration: crop profiles, scoring
//! weights and tolerances, the soil inference policy and the species alias
//! table. It is loaded once, validated, and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::FarmLocation;
use crate::error::DomainError;
use crate::types::{ValueRange, WaterRequirement};
use crate::validation::resolve_location;

/// Knowledge base bundled with the crate
const BUILTIN_CATALOG: &str = include_str!("../../data/crop_catalog.json");

/// Static reference entry for a single crop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropProfile {
    pub name: String,
    pub ideal_temperature_c: ValueRange,
    pub ideal_rainfall_mm: ValueRange,
    pub ideal_soil_types: BTreeSet<String>,
    pub water_requirement: WaterRequirement,
    pub planting_window: String,
    pub harvest_window: String,
    #[serde(default)]
    pub companion_crops: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

impl CropProfile {
    /// Case-insensitive companion lookup
    pub fn is_companion_of(&self, crop_name: &str) -> bool {
        self.companion_crops
            .iter()
            .any(|c| c.eq_ignore_ascii_case(crop_name))
    }
}

/// Weights of the scoring factors; must sum to exactly 1
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringWeights {
    pub temperature: Decimal,
    pub rainfall: Decimal,
    pub soil: Decimal,
    pub vegetation: Decimal,
    pub identification: Decimal,
}

impl ScoringWeights {
    pub fn total(&self) -> Decimal {
        self.temperature + self.rainfall + self.soil + self.vegetation + self.identification
    }

    fn all(&self) -> [(&'static str, Decimal); 5] {
        [
            ("temperature", self.temperature),
            ("rainfall", self.rainfall),
            ("soil", self.soil),
            ("vegetation", self.vegetation),
            ("identification", self.identification),
        ]
    }

    /// Weights in factor order
    pub fn in_factor_order(&self) -> [Decimal; 5] {
        self.all().map(|(_, w)| w)
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            temperature: Decimal::new(30, 2),
            rainfall: Decimal::new(30, 2),
            soil: Decimal::new(15, 2),
            vegetation: Decimal::new(15, 2),
            identification: Decimal::new(10, 2),
        }
    }
}

/// Tunable parameters of the scoring algorithm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringParameters {
    pub weights: ScoringWeights,
    /// Distance beyond the ideal temperature edges at which the fit reaches 0
    pub temperature_tolerance_c: f64,
    /// Distance beyond the ideal rainfall edges at which the fit reaches 0
    pub rainfall_tolerance_mm: f64,
    /// Soil fit when the inferred soil is not among the crop's ideal soils
    pub soil_partial_score: f64,
    /// NDVI at or below which the vegetation fit is 0
    pub ndvi_floor: f64,
    /// NDVI at or above which the vegetation fit is 1
    pub ndvi_saturation: f64,
    /// Identification affinity when the hint names a companion crop
    pub companion_affinity: f64,
    pub default_top_n: usize,
}

impl Default for ScoringParameters {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            temperature_tolerance_c: 10.0,
            rainfall_tolerance_mm: 100.0,
            soil_partial_score: 0.3,
            ndvi_floor: 0.0,
            ndvi_saturation: 0.6,
            companion_affinity: 0.5,
            default_top_n: 3,
        }
    }
}

/// Deterministic climate-bucket to soil type policy
///
/// A value falls into bucket `i` where `i` is the number of thresholds less
/// than or equal to it. `matrix[rain_bucket][humidity_bucket]` names the
/// inferred soil.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoilInferencePolicy {
    pub rainfall_thresholds_mm: Vec<f64>,
    pub humidity_thresholds_pct: Vec<f64>,
    pub matrix: Vec<Vec<String>>,
}

impl SoilInferencePolicy {
    fn bucket(thresholds: &[f64], value: f64) -> usize {
        thresholds.iter().take_while(|t| value >= **t).count()
    }

    pub fn infer(&self, rainfall_mm: f64, humidity_pct: f64) -> &str {
        let row = Self::bucket(&self.rainfall_thresholds_mm, rainfall_mm);
        let col = Self::bucket(&self.humidity_thresholds_pct, humidity_pct);
        self.matrix
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("Unknown")
    }

    fn soil_types(&self) -> HashSet<&str> {
        self.matrix
            .iter()
            .flat_map(|row| row.iter().map(String::as_str))
            .collect()
    }

    fn validate(&self) -> Result<(), DomainError> {
        for (name, thresholds) in [
            ("rainfall", &self.rainfall_thresholds_mm),
            ("humidity", &self.humidity_thresholds_pct),
        ] {
            if thresholds.iter().any(|t| !t.is_finite()) {
                return Err(DomainError::knowledge_base(format!(
                    "{} thresholds must be finite",
                    name
                )));
            }
            if thresholds.windows(2).any(|w| w[0] >= w[1]) {
                return Err(DomainError::knowledge_base(format!(
                    "{} thresholds must be strictly ascending",
                    name
                )));
            }
        }

        let rows = self.rainfall_thresholds_mm.len() + 1;
        let cols = self.humidity_thresholds_pct.len() + 1;
        if self.matrix.len() != rows || self.matrix.iter().any(|r| r.len() != cols) {
            return Err(DomainError::knowledge_base(format!(
                "soil matrix must be {}x{}",
                rows, cols
            )));
        }
        Ok(())
    }
}

/// A named farming region offered in place of typed coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionPreset {
    pub name: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl RegionPreset {
    /// The preset as a resolved location labelled with its name
    pub fn location(&self) -> Result<FarmLocation, DomainError> {
        resolve_location(
            self.latitude.to_string(),
            self.longitude.to_string(),
            Some(self.name.clone()),
        )
    }

    /// Matches "Central Kenya", "central-kenya" and "central_kenya" alike
    fn answers_to(&self, name: &str) -> bool {
        let normalize = |s: &str| s.trim().to_lowercase().replace(['-', '_'], " ");
        normalize(&self.name) == normalize(name)
    }
}

/// The complete, validated crop knowledge base
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBase {
    pub version: String,
    pub scoring: ScoringParameters,
    pub soil_inference: SoilInferencePolicy,
    /// Lower-cased species or common name -> canonical crop name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    pub crops: Vec<CropProfile>,
    #[serde(default)]
    pub regions: Vec<RegionPreset>,
}

impl KnowledgeBase {
    /// Parse and validate a knowledge base from JSON
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let kb: KnowledgeBase = serde_json::from_str(json)
            .map_err(|e| DomainError::knowledge_base(format!("parse error: {}", e)))?;
        kb.validate()?;
        Ok(kb)
    }

    /// The knowledge base bundled with this crate
    pub fn builtin() -> Result<Self, DomainError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Soil type inferred from climate buckets
    pub fn infer_soil(&self, rainfall_mm: f64, humidity_pct: f64) -> &str {
        self.soil_inference.infer(rainfall_mm, humidity_pct)
    }

    /// Resolve a species guess to a catalog crop name via the alias table
    /// or a direct case-insensitive name match
    pub fn canonical_crop(&self, species_guess: &str) -> Option<&str> {
        let key = species_guess.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(name) = self.aliases.get(&key) {
            return Some(name.as_str());
        }
        self.crops
            .iter()
            .find(|c| c.name.to_lowercase() == key)
            .map(|c| c.name.as_str())
    }

    pub fn crop(&self, name: &str) -> Option<&CropProfile> {
        self.crops.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn region(&self, name: &str) -> Option<&RegionPreset> {
        self.regions.iter().find(|r| r.answers_to(name))
    }

    /// Load-time checks. Scoring relies on these to stay total.
    pub fn validate(&self) -> Result<(), DomainError> {
        let params = &self.scoring;

        for (name, weight) in params.weights.all() {
            if weight < Decimal::ZERO {
                return Err(DomainError::knowledge_base(format!(
                    "weight {} cannot be negative",
                    name
                )));
            }
        }
        if params.weights.total() != Decimal::ONE {
            return Err(DomainError::knowledge_base(format!(
                "scoring weights must sum to 1, got {}",
                params.weights.total()
            )));
        }

        if !(params.temperature_tolerance_c >= 0.0 && params.rainfall_tolerance_mm >= 0.0) {
            return Err(DomainError::knowledge_base(
                "tolerances must be non-negative",
            ));
        }
        for (name, value) in [
            ("soil_partial_score", params.soil_partial_score),
            ("companion_affinity", params.companion_affinity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DomainError::knowledge_base(format!(
                    "{} must be within [0, 1]",
                    name
                )));
            }
        }
        if !(params.ndvi_saturation > params.ndvi_floor) {
            return Err(DomainError::knowledge_base(
                "ndvi_saturation must be greater than ndvi_floor",
            ));
        }
        if params.default_top_n == 0 {
            return Err(DomainError::knowledge_base("default_top_n must be at least 1"));
        }

        self.soil_inference.validate()?;
        let known_soils = self.soil_inference.soil_types();

        let mut seen = HashSet::new();
        for crop in &self.crops {
            if !seen.insert(crop.name.to_lowercase()) {
                return Err(DomainError::knowledge_base(format!(
                    "duplicate crop {}",
                    crop.name
                )));
            }
            for (label, range) in [
                ("temperature", crop.ideal_temperature_c),
                ("rainfall", crop.ideal_rainfall_mm),
            ] {
                if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                    return Err(DomainError::knowledge_base(format!(
                        "{} has an invalid ideal {} range {}",
                        crop.name, label, range
                    )));
                }
            }
            if let Some(soil) = crop
                .ideal_soil_types
                .iter()
                .find(|s| !known_soils.contains(s.as_str()))
            {
                return Err(DomainError::knowledge_base(format!(
                    "{} lists soil type {} which the inference policy never produces",
                    crop.name, soil
                )));
            }
        }

        for (alias, target) in &self.aliases {
            if alias != &alias.to_lowercase() {
                return Err(DomainError::knowledge_base(format!(
                    "alias {} must be lower-case",
                    alias
                )));
            }
            if self.crop(target).is_none() {
                return Err(DomainError::knowledge_base(format!(
                    "alias {} points to unknown crop {}",
                    alias, target
                )));
            }
        }

        let mut seen = HashSet::new();
        for region in &self.regions {
            if region.name.trim().is_empty() {
                return Err(DomainError::knowledge_base("region presets need a name"));
            }
            if !seen.insert(region.name.to_lowercase().replace(['-', '_'], " ")) {
                return Err(DomainError::knowledge_base(format!(
                    "duplicate region {}",
                    region.name
                )));
            }
            region.location().map_err(|e| {
                DomainError::knowledge_base(format!("region {}: {}", region.name, e))
            })?;
        }

        Ok(())
    }
}

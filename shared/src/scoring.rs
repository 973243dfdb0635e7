//! Crop scoring engine
//!
//! Fuses a climate snapshot, an optional plant identification hint and the
//! crop knowledge base into a ranked, explained recommendation list.
//!
//! Each crop gets five independent sub-scores in [0, 1]:
//! - temperature fit: 1 at the midpoint of the ideal range, falling linearly
//!   to 0 at `temperature_tolerance_c` beyond either edge
//! - rainfall fit: same shape against the ideal rainfall range
//! - soil fit: 1 when the inferred soil is ideal, else `soil_partial_score`
//! - vegetation fit: NDVI mapped linearly from `ndvi_floor` (0) to
//!   `ndvi_saturation` (1)
//! - identification fit: hint confidence times the affinity between the
//!   identified species and the crop (identity 1, companion
//!   `companion_affinity`, otherwise 0)
//!
//! The weighted sum (weights total exactly 1) is taken in `Decimal`, so a
//! combined score of exactly x.5 percent rounds up, then scaled to an
//! integer confidence, sorted descending with catalog order breaking ties,
//! and ranked from 1. Scoring is pure and never fails.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{
    ClimateSnapshot, CropProfile, CropRecommendation, FactorScores, KnowledgeBase,
    PlantIdentificationHint, ScoringParameters,
};
use crate::types::ValueRange;

/// Runner-up factors contributing at least this share of the top factor
/// (tenths) are mentioned in the rationale too
const SECONDARY_FACTOR_SHARE: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

/// Confidence below which the rationale is flagged as marginal
const MARGINAL_CONFIDENCE: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Factor {
    Temperature,
    Rainfall,
    Soil,
    Vegetation,
    Identification,
}

const FACTORS: [Factor; 5] = [
    Factor::Temperature,
    Factor::Rainfall,
    Factor::Soil,
    Factor::Vegetation,
    Factor::Identification,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HintMatch {
    Identical,
    Companion,
}

#[derive(Debug, Clone, Copy)]
struct SubScores {
    temperature: f64,
    rainfall: f64,
    soil: f64,
    vegetation: f64,
    identification: f64,
}

impl SubScores {
    fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Temperature => self.temperature,
            Factor::Rainfall => self.rainfall,
            Factor::Soil => self.soil,
            Factor::Vegetation => self.vegetation,
            Factor::Identification => self.identification,
        }
    }

    /// Sub-scores as exact decimals, in factor order
    fn to_decimals(self) -> [Decimal; 5] {
        FACTORS.map(|factor| unit_decimal(self.get(factor)))
    }

    fn to_percents(self) -> FactorScores {
        FactorScores {
            temperature: to_percent(self.temperature),
            rainfall: to_percent(self.rainfall),
            soil: to_percent(self.soil),
            vegetation: to_percent(self.vegetation),
            identification: to_percent(self.identification),
        }
    }
}

/// Per-crop intermediate result before ranking
struct ScoredCrop<'c> {
    profile: &'c CropProfile,
    sub: SubScores,
    confidence: u8,
    soil_matched: bool,
    hint_match: Option<HintMatch>,
}

/// Deterministic crop scorer over a validated knowledge base
pub struct CropScoringEngine<'kb> {
    kb: &'kb KnowledgeBase,
    weights: [Decimal; 5],
}

impl<'kb> CropScoringEngine<'kb> {
    pub fn new(kb: &'kb KnowledgeBase) -> Self {
        Self {
            kb,
            weights: kb.scoring.weights.in_factor_order(),
        }
    }

    pub fn parameters(&self) -> &ScoringParameters {
        &self.kb.scoring
    }

    /// Rank every crop in `catalog`
    ///
    /// Returns the full ranking; an empty catalog yields an empty list.
    pub fn score(
        &self,
        snapshot: &ClimateSnapshot,
        hint: Option<&PlantIdentificationHint>,
        catalog: &[CropProfile],
    ) -> Vec<CropRecommendation> {
        let soil = self.kb.infer_soil(snapshot.rainfall_mm, snapshot.humidity_pct);

        let mut scored: Vec<ScoredCrop> = catalog
            .iter()
            .map(|profile| self.score_crop(profile, snapshot, soil, hint))
            .collect();

        // sort_by is stable: equal confidences keep catalog order
        scored.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        scored
            .into_iter()
            .enumerate()
            .map(|(i, crop)| {
                let rationale = self.rationale(&crop, snapshot, soil, hint);
                CropRecommendation {
                    crop_name: crop.profile.name.clone(),
                    confidence: crop.confidence,
                    rank: i as u32 + 1,
                    rationale,
                    planting_window: crop.profile.planting_window.clone(),
                    harvest_window: crop.profile.harvest_window.clone(),
                    water_requirement: crop.profile.water_requirement,
                    inferred_soil_type: soil.to_string(),
                    companion_crops: crop.profile.companion_crops.clone(),
                    benefits: crop.profile.benefits.clone(),
                    factors: crop.sub.to_percents(),
                }
            })
            .collect()
    }

    /// Rank the knowledge base's own catalog
    pub fn score_full(
        &self,
        snapshot: &ClimateSnapshot,
        hint: Option<&PlantIdentificationHint>,
    ) -> Vec<CropRecommendation> {
        self.score(snapshot, hint, &self.kb.crops)
    }

    /// Top-N view for presentation; `None` uses the configured default
    pub fn recommend(
        &self,
        snapshot: &ClimateSnapshot,
        hint: Option<&PlantIdentificationHint>,
        top_n: Option<usize>,
    ) -> Vec<CropRecommendation> {
        let mut ranked = self.score_full(snapshot, hint);
        ranked.truncate(top_n.unwrap_or(self.kb.scoring.default_top_n));
        ranked
    }

    fn score_crop<'c>(
        &self,
        profile: &'c CropProfile,
        snapshot: &ClimateSnapshot,
        soil: &str,
        hint: Option<&PlantIdentificationHint>,
    ) -> ScoredCrop<'c> {
        let params = &self.kb.scoring;

        let soil_matched = profile.ideal_soil_types.contains(soil);
        let hint_match = hint.and_then(|h| self.match_hint(profile, h));
        let affinity = match hint_match {
            Some(HintMatch::Identical) => 1.0,
            Some(HintMatch::Companion) => params.companion_affinity,
            None => 0.0,
        };

        let sub = SubScores {
            temperature: range_fit(
                snapshot.temperature_c,
                profile.ideal_temperature_c,
                params.temperature_tolerance_c,
            ),
            rainfall: range_fit(
                snapshot.rainfall_mm,
                profile.ideal_rainfall_mm,
                params.rainfall_tolerance_mm,
            ),
            soil: if soil_matched {
                1.0
            } else {
                params.soil_partial_score
            },
            vegetation: vegetation_fit(snapshot.ndvi, params.ndvi_floor, params.ndvi_saturation),
            identification: hint.map_or(0.0, |h| affinity * h.effective_confidence()),
        };

        // Identification is added last so a hint can only raise the sum
        let combined: Decimal = self.weighted(&sub).iter().map(|(_, c)| *c).sum();

        ScoredCrop {
            profile,
            sub,
            confidence: decimal_percent(combined),
            soil_matched,
            hint_match,
        }
    }

    fn match_hint(&self, profile: &CropProfile, hint: &PlantIdentificationHint) -> Option<HintMatch> {
        let guess = hint.species_guess.trim();
        let canonical = self.kb.canonical_crop(guess);

        if canonical.is_some_and(|name| name.eq_ignore_ascii_case(&profile.name))
            || guess.eq_ignore_ascii_case(&profile.name)
        {
            return Some(HintMatch::Identical);
        }
        if canonical.is_some_and(|name| profile.is_companion_of(name)) || profile.is_companion_of(guess) {
            return Some(HintMatch::Companion);
        }
        None
    }

    fn weighted(&self, sub: &SubScores) -> [(Factor, Decimal); 5] {
        let scores = sub.to_decimals();
        let mut out = [(Factor::Temperature, Decimal::ZERO); 5];
        for (i, factor) in FACTORS.iter().enumerate() {
            out[i] = (*factor, self.weights[i] * scores[i]);
        }
        out
    }

    fn rationale(
        &self,
        crop: &ScoredCrop,
        snapshot: &ClimateSnapshot,
        soil: &str,
        hint: Option<&PlantIdentificationHint>,
    ) -> String {
        let mut contributions = self.weighted(&crop.sub);
        // Stable: on equal contribution the earlier factor wins
        contributions.sort_by(|a, b| b.1.cmp(&a.1));

        let (top, top_value) = contributions[0];
        let mut text = if top_value > Decimal::ZERO {
            self.describe(top, crop, snapshot, soil, hint)
        } else {
            "No climate factor currently favors this crop".to_string()
        };

        let (runner_up, runner_value) = contributions[1];
        if top_value > Decimal::ZERO && runner_value >= top_value * SECONDARY_FACTOR_SHARE {
            text.push_str("; ");
            text.push_str(&lower_first(&self.describe(runner_up, crop, snapshot, soil, hint)));
        }

        if crop.confidence < MARGINAL_CONFIDENCE {
            text = format!("Marginal fit: {}", lower_first(&text));
        }
        text
    }

    fn describe(
        &self,
        factor: Factor,
        crop: &ScoredCrop,
        snapshot: &ClimateSnapshot,
        soil: &str,
        hint: Option<&PlantIdentificationHint>,
    ) -> String {
        let profile = crop.profile;
        match factor {
            Factor::Temperature => format!(
                "Current temperature of {:.1}°C is {} the ideal {}°C range",
                snapshot.temperature_c,
                position(snapshot.temperature_c, profile.ideal_temperature_c),
                profile.ideal_temperature_c
            ),
            Factor::Rainfall => format!(
                "Rainfall of {:.0}mm is {} the ideal {}mm range",
                snapshot.rainfall_mm,
                position(snapshot.rainfall_mm, profile.ideal_rainfall_mm),
                profile.ideal_rainfall_mm
            ),
            Factor::Soil if crop.soil_matched => {
                format!("{} soil inferred from local rainfall and humidity suits this crop", soil)
            }
            Factor::Soil => format!(
                "{} soil inferred from local rainfall and humidity is workable but not ideal",
                soil
            ),
            Factor::Vegetation => {
                let health = match crop.sub.vegetation {
                    v if v >= 0.8 => "healthy",
                    v if v >= 0.4 => "moderate",
                    _ => "sparse",
                };
                format!(
                    "Vegetation index of {:.2} indicates {} ground cover",
                    snapshot.ndvi, health
                )
            }
            Factor::Identification => {
                let (species, pct) = hint.map_or((String::new(), 0), |h| {
                    (h.species_guess.trim().to_string(), to_percent(h.effective_confidence()))
                });
                let relation = match crop.hint_match {
                    Some(HintMatch::Companion) => "a companion of this crop",
                    _ => "a match for this crop",
                };
                format!(
                    "Your photo was identified as {} ({}% confidence), {}",
                    species, pct, relation
                )
            }
        }
    }
}

/// Linear fit against an ideal range: 1 at the midpoint, 0 at `tolerance`
/// beyond either edge, clamped to [0, 1]
pub fn range_fit(value: f64, range: ValueRange, tolerance: f64) -> f64 {
    let reach = range.half_width() + tolerance.max(0.0);
    let distance = (value - range.midpoint()).abs();
    if reach <= 0.0 {
        return if distance == 0.0 { 1.0 } else { 0.0 };
    }
    clamp_unit(1.0 - distance / reach)
}

/// Monotonic NDVI fit: 0 at or below `floor`, 1 at or above `saturation`
pub fn vegetation_fit(ndvi: f64, floor: f64, saturation: f64) -> f64 {
    if saturation <= floor {
        return if ndvi >= saturation { 1.0 } else { 0.0 };
    }
    clamp_unit((ndvi - floor) / (saturation - floor))
}

/// Round to a whole number, halves away from zero
pub fn round_half_up(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// A [0, 1] score as the shortest decimal that round-trips the float, so
/// 0.15 is exactly 0.15 rather than its binary approximation
fn unit_decimal(x: f64) -> Decimal {
    Decimal::from_f64(clamp_unit(x)).unwrap_or_default()
}

/// Scale a [0, 1] score to an integer percent in [0, 100]
fn decimal_percent(x: Decimal) -> u8 {
    let unit = x.clamp(Decimal::ZERO, Decimal::ONE);
    round_half_up(unit * Decimal::ONE_HUNDRED).to_u8().unwrap_or_default()
}

fn to_percent(x: f64) -> u8 {
    decimal_percent(unit_decimal(x))
}

fn position(value: f64, range: ValueRange) -> &'static str {
    if range.contains(value) {
        "within"
    } else if value < range.min {
        "below"
    } else {
        "above"
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

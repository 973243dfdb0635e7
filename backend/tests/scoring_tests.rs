//! Tests for the crop scoring engine
//!
//! Properties of the ranking (bounded confidence, dense ranks, determinism,
//! hint monotonicity) plus the reference highland scenario.

mod common;

use std::collections::HashMap;

use chrono::Utc;
use common::{knowledge, location};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    resolve_location, ClimateSnapshot, ConfidenceBand, CropRecommendation, CropScoringEngine,
    PlantIdentificationHint, WaterRequirement,
};

fn snapshot(temperature_c: f64, rainfall_mm: f64, humidity_pct: f64, ndvi: f64) -> ClimateSnapshot {
    ClimateSnapshot {
        temperature_c,
        rainfall_mm,
        humidity_pct,
        wind_kph: 12.0,
        uv_index: 7.0,
        ndvi,
        observed_at: Utc::now(),
        location: location(),
    }
}

/// Kiambu-like highland conditions
fn highland() -> ClimateSnapshot {
    snapshot(28.0, 125.0, 65.0, 0.72)
}

fn by_name(recommendations: &[CropRecommendation]) -> HashMap<String, CropRecommendation> {
    recommendations
        .iter()
        .map(|r| (r.crop_name.clone(), r.clone()))
        .collect()
}

// ============================================================================
// Strategies
// ============================================================================

fn snapshot_strategy() -> impl Strategy<Value = ClimateSnapshot> {
    (
        -30.0f64..55.0,
        0.0f64..600.0,
        0.0f64..=100.0,
        0.0f64..150.0,
        0.0f64..15.0,
        -1.0f64..=1.0,
        -89_000_000i64..=89_000_000,
        -179_000_000i64..=179_000_000,
    )
        .prop_map(|(t, r, h, w, uv, ndvi, lat, lng)| ClimateSnapshot {
            temperature_c: t,
            rainfall_mm: r,
            humidity_pct: h,
            wind_kph: w,
            uv_index: uv,
            ndvi,
            observed_at: Utc::now(),
            location: resolve_location(lat as f64 / 1e6, lng as f64 / 1e6, None)
                .expect("generated coordinates are in range"),
        })
}

fn hint_strategy() -> impl Strategy<Value = PlantIdentificationHint> {
    let species = prop_oneof![
        Just("Zea mays"),
        Just("corn"),
        Just("manioc"),
        Just("Oryza sativa"),
        Just("Beans"),
        Just("groundnut"),
        Just("Solanum lycopersicum"),
        Just(""),
    ];
    (species, 0.0f64..=1.0).prop_map(|(s, c)| PlantIdentificationHint::new(s, c))
}

/// Hints for crops no other catalog crop lists as a companion, so the hint
/// lifts exactly one crop
fn solitary_hint_strategy() -> impl Strategy<Value = (&'static str, PlantIdentificationHint)> {
    let species = prop_oneof![
        Just(("Rice", "Oryza sativa")),
        Just(("Rice", "paddy")),
        Just(("Wheat", "Triticum aestivum")),
        Just(("Wheat", "wheat")),
    ];
    (species, 0.0f64..=1.0)
        .prop_map(|((crop, guess), c)| (crop, PlantIdentificationHint::new(guess, c)))
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every crop is scored, with confidence in 0..=100
    #[test]
    fn confidence_is_bounded(snap in snapshot_strategy(), hint in proptest::option::of(hint_strategy())) {
        let kb = knowledge();
        let ranked = CropScoringEngine::new(&kb).score_full(&snap, hint.as_ref());

        prop_assert_eq!(ranked.len(), kb.crops.len());
        for rec in &ranked {
            prop_assert!(rec.confidence <= 100);
            prop_assert!(!rec.rationale.is_empty());
        }
    }

    /// Ranks are 1..=n with no gaps and confidence never increases down the list
    #[test]
    fn ranks_are_dense_and_sorted(snap in snapshot_strategy(), hint in proptest::option::of(hint_strategy())) {
        let kb = knowledge();
        let ranked = CropScoringEngine::new(&kb).score_full(&snap, hint.as_ref());

        for (i, rec) in ranked.iter().enumerate() {
            prop_assert_eq!(rec.rank, i as u32 + 1);
        }
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    /// Same inputs always give the same ranking and rationale
    #[test]
    fn scoring_is_deterministic(snap in snapshot_strategy(), hint in proptest::option::of(hint_strategy())) {
        let kb = knowledge();
        let engine = CropScoringEngine::new(&kb);
        prop_assert_eq!(
            engine.score_full(&snap, hint.as_ref()),
            engine.score_full(&snap, hint.as_ref())
        );
    }

    /// A hint only ever adds to a crop's score
    #[test]
    fn hint_never_lowers_a_score(snap in snapshot_strategy(), hint in hint_strategy()) {
        let kb = knowledge();
        let engine = CropScoringEngine::new(&kb);
        let without = by_name(&engine.score_full(&snap, None));
        let with = by_name(&engine.score_full(&snap, Some(&hint)));

        for (name, rec) in &with {
            prop_assert!(rec.confidence >= without[name].confidence, "{} dropped", name);
        }
    }

    /// A hint for a crop never worsens that crop's rank, and never
    /// improves the rank of any crop it does not lift
    #[test]
    fn hint_never_worsens_hinted_rank(snap in snapshot_strategy(), (crop, hint) in solitary_hint_strategy()) {
        let kb = knowledge();
        let engine = CropScoringEngine::new(&kb);
        let without = by_name(&engine.score_full(&snap, None));
        let with = by_name(&engine.score_full(&snap, Some(&hint)));

        prop_assert!(with[crop].rank <= without[crop].rank);
        for (name, rec) in &with {
            if name != crop {
                prop_assert_eq!(rec.factors.identification, 0);
                prop_assert!(rec.rank >= without[name].rank, "{} moved up", name);
            }
        }
    }

    /// The whole ranking survives the JSON trip to the front end in order
    #[test]
    fn full_ranking_round_trips_through_json(snap in snapshot_strategy(), hint in proptest::option::of(hint_strategy())) {
        let kb = knowledge();
        let ranked = CropScoringEngine::new(&kb).score_full(&snap, hint.as_ref());

        let json = serde_json::to_string(&ranked).unwrap();
        let back: Vec<CropRecommendation> = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(&back, &ranked);
        let ranks: Vec<u32> = back.iter().map(|r| r.rank).collect();
        prop_assert_eq!(ranks, (1..=ranked.len() as u32).collect::<Vec<_>>());
    }

    /// Top-N is always a prefix of the full ranking
    #[test]
    fn top_n_is_prefix_of_full(snap in snapshot_strategy(), n in 0usize..12) {
        let kb = knowledge();
        let engine = CropScoringEngine::new(&kb);
        let full = engine.score_full(&snap, None);
        let top = engine.recommend(&snap, None, Some(n));

        prop_assert_eq!(top.len(), n.min(full.len()));
        prop_assert_eq!(&full[..top.len()], &top[..]);
    }
}

// ============================================================================
// Reference Scenario
// ============================================================================

mod highland_scenario {
    use super::*;

    #[test]
    fn maize_leads_without_photo() {
        let kb = knowledge();
        let top = CropScoringEngine::new(&kb).recommend(&highland(), None, None);

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].crop_name, "Maize");
        assert_eq!(top[0].confidence, 82);
        assert_eq!(top[0].inferred_soil_type, "Loamy");
        assert_eq!(top[0].water_requirement, WaterRequirement::Moderate);
        assert_eq!(top[0].confidence_band(), ConfidenceBand::High);
        assert_eq!(top[0].rank_label(), "Best Match");
    }

    #[test]
    fn maize_factor_breakdown() {
        let kb = knowledge();
        let ranked = CropScoringEngine::new(&kb).score_full(&highland(), None);
        let maize = &by_name(&ranked)["Maize"];

        assert_eq!(maize.factors.temperature, 80);
        assert_eq!(maize.factors.rainfall, 93);
        assert_eq!(maize.factors.soil, 100);
        assert_eq!(maize.factors.vegetation, 100);
        assert_eq!(maize.factors.identification, 0);
    }

    #[test]
    fn confirmed_maize_photo_adds_ten_points() {
        let kb = knowledge();
        let hint = PlantIdentificationHint::new("Zea mays", 1.0);
        let top = CropScoringEngine::new(&kb).recommend(&highland(), Some(&hint), None);

        assert_eq!(top[0].crop_name, "Maize");
        assert_eq!(top[0].confidence, 92);
        assert!(top[0].rationale.contains("Zea mays"));
    }

    #[test]
    fn beans_hint_does_not_worsen_beans_rank() {
        let kb = knowledge();
        let engine = CropScoringEngine::new(&kb);
        let hint = PlantIdentificationHint::new("common bean", 0.9);

        let before = by_name(&engine.score_full(&highland(), None))["Beans"].clone();
        let after = by_name(&engine.score_full(&highland(), Some(&hint)))["Beans"].clone();

        assert!(after.rank <= before.rank);
        assert_eq!(after.confidence, before.confidence + 9);
    }

    #[test]
    fn beans_hint_lifts_its_companions() {
        let kb = knowledge();
        let engine = CropScoringEngine::new(&kb);
        let hint = PlantIdentificationHint::new("common bean", 0.9);

        let ranked = by_name(&engine.score_full(&highland(), Some(&hint)));
        // Maize lists Beans as a companion, Wheat does not
        assert!(ranked["Maize"].factors.identification > 0);
        assert_eq!(ranked["Wheat"].factors.identification, 0);
    }

    #[test]
    fn hot_dry_conditions_favor_drought_crops() {
        let kb = knowledge();
        let top = CropScoringEngine::new(&kb).recommend(&snapshot(33.0, 60.0, 30.0, 0.3), None, Some(3));
        let names: Vec<_> = top.iter().map(|r| r.crop_name.as_str()).collect();

        assert!(names.contains(&"Sorghum"), "{:?}", names);
        assert!(!names.contains(&"Rice"), "{:?}", names);
        assert!(!names.contains(&"Wheat"), "{:?}", names);
    }
}

// ============================================================================
// Knowledge Base
// ============================================================================

mod knowledge_base {
    use super::*;

    #[test]
    fn weights_sum_to_exactly_one() {
        assert_eq!(knowledge().scoring.weights.total(), Decimal::ONE);
    }

    #[test]
    fn every_alias_points_at_a_catalog_crop() {
        let kb = knowledge();
        for target in kb.aliases.values() {
            assert!(kb.crop(target).is_some(), "{} is not in the catalog", target);
        }
    }

    #[test]
    fn recommendations_serialize_for_the_front_end() {
        let kb = knowledge();
        let top = CropScoringEngine::new(&kb).recommend(&highland(), None, Some(3));
        let json = serde_json::to_value(&top).unwrap();

        assert_eq!(json[0]["crop_name"], "Maize");
        assert_eq!(json[0]["rank"], 1);
        assert_eq!(json[0]["water_requirement"], "moderate");
        assert_eq!(json[0]["factors"]["soil"], 100);

        let back: Vec<CropRecommendation> = serde_json::from_value(json).unwrap();
        assert_eq!(back, top);
    }
}

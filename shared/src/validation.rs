//! Validation utilities for the recommendation core
//!
//! Coordinate resolution and climate bounds checks. Everything here is pure:
//! no I/O, no clocks.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::DomainError;
use crate::models::{ClimateReading, ClimateSnapshot, FarmLocation};
use crate::types::RawCoordinate;

// ============================================================================
// Location Resolution
// ============================================================================

pub const LATITUDE_LIMIT: i64 = 90;
pub const LONGITUDE_LIMIT: i64 = 180;

/// Validate and normalize a raw coordinate pair into a [`FarmLocation`]
///
/// Numbers and numeric strings go through the same decimal parsing, so
/// `"18.50"` and `18.5` resolve to the same location. Resolving an already
/// resolved location yields identical values.
pub fn resolve_location(
    raw_lat: impl Into<RawCoordinate>,
    raw_lng: impl Into<RawCoordinate>,
    label: Option<String>,
) -> Result<FarmLocation, DomainError> {
    let latitude = parse_coordinate("latitude", raw_lat.into(), LATITUDE_LIMIT)?;
    let longitude = parse_coordinate("longitude", raw_lng.into(), LONGITUDE_LIMIT)?;

    let label = label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    Ok(FarmLocation {
        latitude,
        longitude,
        label,
    })
}

fn parse_coordinate(field: &str, raw: RawCoordinate, limit: i64) -> Result<Decimal, DomainError> {
    let text = match raw {
        RawCoordinate::Number(n) if !n.is_finite() => {
            return Err(DomainError::coordinates(field, "must be a finite number"));
        }
        RawCoordinate::Number(n) => n.to_string(),
        RawCoordinate::Text(s) => s.trim().to_string(),
    };

    if text.is_empty() {
        return Err(DomainError::coordinates(field, "is empty"));
    }

    let value = Decimal::from_str(&text)
        .map_err(|_| DomainError::coordinates(field, format!("'{}' is not a number", text)))?;

    let limit = Decimal::from(limit);
    if value < -limit || value > limit {
        return Err(DomainError::coordinates(
            field,
            format!("{} is outside [-{}, {}]", value, limit, limit),
        ));
    }

    Ok(value.normalize())
}

// ============================================================================
// Climate Validations
// ============================================================================

/// Humidity may overshoot [0, 100] by this much before it is rejected;
/// values inside the margin are clamped
pub const HUMIDITY_TOLERANCE_PCT: f64 = 1.0;

pub const MIN_TEMPERATURE_C: f64 = -90.0;
pub const MAX_TEMPERATURE_C: f64 = 60.0;

/// Validate an upstream reading and build the snapshot for `location`
///
/// Humidity within [`HUMIDITY_TOLERANCE_PCT`] outside [0, 100] is clamped
/// rather than rejected; every other bound is strict.
pub fn validate_climate_reading(
    reading: &ClimateReading,
    location: FarmLocation,
) -> Result<ClimateSnapshot, DomainError> {
    let humidity_pct = lenient_humidity(reading.humidity_pct)?;

    let snapshot = ClimateSnapshot {
        temperature_c: reading.temperature_c,
        rainfall_mm: reading.rainfall_mm,
        humidity_pct,
        wind_kph: reading.wind_kph,
        uv_index: reading.uv_index,
        ndvi: reading.ndvi,
        observed_at: reading.observed_at,
        location,
    };
    validate_snapshot(&snapshot)?;
    Ok(snapshot)
}

/// Clamp humidity into [0, 100] when it is within tolerance of the range
pub fn lenient_humidity(humidity_pct: f64) -> Result<f64, DomainError> {
    if !humidity_pct.is_finite() {
        return Err(DomainError::climate("humidity_pct", humidity_pct, "not a finite number"));
    }
    let lower = -HUMIDITY_TOLERANCE_PCT;
    let upper = 100.0 + HUMIDITY_TOLERANCE_PCT;
    if humidity_pct < lower || humidity_pct > upper {
        return Err(DomainError::climate(
            "humidity_pct",
            humidity_pct,
            "outside [0, 100] beyond tolerance",
        ));
    }
    Ok(humidity_pct.clamp(0.0, 100.0))
}

/// Strict physical bounds check of a snapshot
pub fn validate_snapshot(snapshot: &ClimateSnapshot) -> Result<(), DomainError> {
    let fields = [
        ("temperature_c", snapshot.temperature_c),
        ("rainfall_mm", snapshot.rainfall_mm),
        ("humidity_pct", snapshot.humidity_pct),
        ("wind_kph", snapshot.wind_kph),
        ("uv_index", snapshot.uv_index),
        ("ndvi", snapshot.ndvi),
    ];
    if let Some((field, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(DomainError::climate(field, *value, "not a finite number"));
    }

    if !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&snapshot.temperature_c) {
        return Err(DomainError::climate(
            "temperature_c",
            snapshot.temperature_c,
            "outside physically plausible range",
        ));
    }
    if !(0.0..=100.0).contains(&snapshot.humidity_pct) {
        return Err(DomainError::climate(
            "humidity_pct",
            snapshot.humidity_pct,
            "outside [0, 100]",
        ));
    }
    for (field, value) in [
        ("rainfall_mm", snapshot.rainfall_mm),
        ("wind_kph", snapshot.wind_kph),
        ("uv_index", snapshot.uv_index),
    ] {
        if value < 0.0 {
            return Err(DomainError::climate(field, value, "cannot be negative"));
        }
    }
    if !(-1.0..=1.0).contains(&snapshot.ndvi) {
        return Err(DomainError::climate("ndvi", snapshot.ndvi, "outside [-1, 1]"));
    }

    Ok(())
}

//! Farm location model

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A validated, normalized farm location
///
/// Created by [`crate::validation::resolve_location`], which guarantees the
/// coordinates are within bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FarmLocation {
    pub latitude: Decimal,
    pub longitude: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FarmLocation {
    /// Grid cell the location falls into, used to key cached climate data.
    /// Two decimal places is roughly 1 km at the equator.
    pub fn grid_key(&self) -> (Decimal, Decimal) {
        (self.latitude.round_dp(2), self.longitude.round_dp(2))
    }

    pub fn latitude_f64(&self) -> f64 {
        self.latitude.to_f64().unwrap_or_default()
    }

    pub fn longitude_f64(&self) -> f64 {
        self.longitude.to_f64().unwrap_or_default()
    }

    /// Label shown to the farmer, falling back to the coordinates
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{}, {}", self.latitude, self.longitude),
        }
    }
}

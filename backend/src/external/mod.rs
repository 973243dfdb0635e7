//! External API integrations
//!
//! The traits here are the seams the services depend on; the reqwest
//! clients are the production implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{ClimateReading, FarmLocation, IdentificationOutcome, PlantPhoto};

use crate::error::AppResult;

pub mod climate;
pub mod plant_id;

pub use climate::ClimateApiClient;
pub use plant_id::PlantIdClient;

/// Upstream source of raw climate readings
#[async_trait]
pub trait ClimateSource: Send + Sync {
    /// Fetch the reading closest to `as_of`, or the latest one.
    ///
    /// Transport failures should surface as `AppError::ClimateUnavailable`
    /// so they are retried; contract violations as
    /// `AppError::ClimateDataInvalid`.
    async fn fetch(
        &self,
        location: &FarmLocation,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<ClimateReading>;
}

/// Upstream plant identification service
#[async_trait]
pub trait PlantIdentifier: Send + Sync {
    async fn identify(&self, photo: &PlantPhoto) -> AppResult<IdentificationOutcome>;
}

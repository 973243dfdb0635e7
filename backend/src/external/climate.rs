//! Climate data API client
//!
//! Talks to the conditions endpoint of the climate data provider, which
//! combines weather station data with satellite vegetation indices.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shared::{ClimateReading, FarmLocation};

use super::ClimateSource;
use crate::config::ClimateConfig;
use crate::error::{AppError, AppResult};

/// Climate API client
#[derive(Clone)]
pub struct ClimateApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Conditions endpoint response
#[derive(Debug, Deserialize)]
struct ConditionsResponse {
    /// Observation time, unix seconds
    dt: i64,
    main: ConditionsMain,
    wind: ConditionsWind,
    #[serde(default)]
    rain: Option<ConditionsRain>,
    uvi: f64,
    ndvi: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionsMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionsWind {
    /// km/h
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionsRain {
    /// Accumulated rainfall over the trailing 30 days
    #[serde(rename = "30d")]
    thirty_day: Option<f64>,
}

impl ClimateApiClient {
    /// Create a new ClimateApiClient from configuration
    pub fn new(config: &ClimateConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("climate HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new ClimateApiClient with custom base URL (for testing)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    fn conditions_url(&self, location: &FarmLocation, as_of: Option<DateTime<Utc>>) -> String {
        let mut url = format!(
            "{}/conditions?lat={}&lon={}",
            self.base_url, location.latitude, location.longitude
        );
        if let Some(at) = as_of {
            url.push_str(&format!("&at={}", at.timestamp()));
        }
        url
    }

    /// Convert the provider response to a raw reading
    fn convert_response(&self, data: ConditionsResponse) -> AppResult<ClimateReading> {
        let observed_at = DateTime::from_timestamp(data.dt, 0).ok_or_else(|| {
            AppError::ClimateDataInvalid(format!("observation time {} is out of range", data.dt))
        })?;

        Ok(ClimateReading {
            temperature_c: data.main.temp,
            rainfall_mm: data.rain.and_then(|r| r.thirty_day).unwrap_or(0.0),
            humidity_pct: data.main.humidity,
            wind_kph: data.wind.speed,
            uv_index: data.uvi,
            ndvi: data.ndvi,
            observed_at,
        })
    }
}

#[async_trait]
impl ClimateSource for ClimateApiClient {
    async fn fetch(
        &self,
        location: &FarmLocation,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<ClimateReading> {
        let url = self.conditions_url(location, as_of);

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::ClimateUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    AppError::ClimateDataInvalid(format!("{} - {}", status, body))
                }
                _ => AppError::ClimateUnavailable(format!("{} - {}", status, body)),
            });
        }

        let data: ConditionsResponse = response.json().await.map_err(|e| {
            AppError::ClimateDataInvalid(format!("failed to parse conditions response: {}", e))
        })?;

        self.convert_response(data)
    }
}

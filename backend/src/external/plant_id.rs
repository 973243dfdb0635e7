//! Plant Identification Client
//!
//! Client for the hosted plant identification microservice. The service
//! classifies a photo and answers with either a species guess or an
//! explicit "unidentified".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{IdentificationOutcome, PlantIdentificationHint, PlantPhoto};

use super::PlantIdentifier;
use crate::config::IdentificationConfig;
use crate::error::{AppError, AppResult};

/// Client for the plant identification microservice
#[derive(Clone)]
pub struct PlantIdClient {
    api_endpoint: String,
    api_key: String,
    http_client: Client,
}

/// Request to identify the plant in an image
#[derive(Debug, Serialize)]
struct IdentifyRequest<'a> {
    image_base64: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
}

/// Response from the identification API
#[derive(Debug, Deserialize)]
struct IdentifyResponse {
    #[serde(default)]
    species: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl From<IdentifyResponse> for IdentificationOutcome {
    fn from(r: IdentifyResponse) -> Self {
        match r.species.filter(|s| !s.trim().is_empty()) {
            Some(species) => IdentificationOutcome::Identified(PlantIdentificationHint::new(
                species,
                r.confidence.unwrap_or(0.0),
            )),
            None => IdentificationOutcome::Unidentified,
        }
    }
}

impl PlantIdClient {
    /// Create a new plant identification client
    ///
    /// The HTTP timeout is a backstop; sessions apply their own shorter
    /// deadline around `identify`.
    pub fn new(config: &IdentificationConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.saturating_mul(2).max(1)))
            .build()
            .map_err(|e| AppError::Configuration(format!("identification HTTP client: {}", e)))?;

        Ok(Self {
            api_endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl PlantIdentifier for PlantIdClient {
    async fn identify(&self, photo: &PlantPhoto) -> AppResult<IdentificationOutcome> {
        let url = format!("{}/identify", self.api_endpoint);
        let request = IdentifyRequest {
            image_base64: &photo.image_base64,
            mime_type: photo.mime_type.as_deref(),
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::IdentificationDegraded(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentificationDegraded(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let data: IdentifyResponse = response.json().await.map_err(|e| {
            AppError::IdentificationDegraded(format!("failed to parse response: {}", e))
        })?;

        Ok(data.into())
    }
}

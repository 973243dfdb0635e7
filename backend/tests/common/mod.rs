//! In-memory fakes and fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crop_advisor::config::{
    CatalogConfig, ClimateConfig, Config, IdentificationConfig, RetryPolicy, ServerConfig,
    SessionConfig,
};
use crop_advisor::error::{AppError, AppResult};
use crop_advisor::external::{ClimateSource, PlantIdentifier};
use crop_advisor::services::{ClimateSnapshotProvider, SessionContext, SessionSettings};
use shared::{
    resolve_location, ClimateReading, FarmLocation, IdentificationOutcome, KnowledgeBase,
    PlantIdentificationHint, PlantPhoto,
};

// =============================================================================
// Fixtures
// =============================================================================

pub fn observed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap()
}

/// Nairobi-like conditions where Maize should lead
pub fn reading() -> ClimateReading {
    ClimateReading {
        temperature_c: 28.0,
        rainfall_mm: 125.0,
        humidity_pct: 65.0,
        wind_kph: 12.0,
        uv_index: 7.0,
        ndvi: 0.72,
        observed_at: Utc::now(),
    }
}

pub fn location() -> FarmLocation {
    resolve_location(-1.2921, 36.8219, Some("Kiambu plot".into())).unwrap()
}

pub fn photo() -> PlantPhoto {
    PlantPhoto {
        image_base64: "aGVsbG8gY29ybg==".into(),
        mime_type: Some("image/jpeg".into()),
    }
}

pub fn knowledge() -> Arc<KnowledgeBase> {
    Arc::new(KnowledgeBase::builtin().unwrap())
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(40),
    }
}

pub fn provider(source: Arc<FakeClimateSource>) -> Arc<ClimateSnapshotProvider> {
    Arc::new(ClimateSnapshotProvider::new(
        source,
        chrono::Duration::hours(3),
        fast_retry(),
    ))
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        input_wait: Duration::from_secs(2),
        identification_timeout: Duration::from_secs(1),
        top_n: 3,
    }
}

pub fn context(climate: Arc<FakeClimateSource>, identifier: Arc<FakeIdentifier>) -> SessionContext {
    SessionContext {
        climate: provider(climate),
        identifier,
        knowledge: knowledge(),
        settings: settings(),
    }
}

pub fn test_config() -> Config {
    Config {
        environment: "test".into(),
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".into(),
        },
        climate: ClimateConfig {
            api_endpoint: "http://climate.test/v1".into(),
            api_key: "test".into(),
            request_timeout_secs: 1,
            cache_freshness_secs: 3 * 60 * 60,
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
        },
        identification: IdentificationConfig {
            api_endpoint: "http://plant-id.test/v1".into(),
            api_key: "test".into(),
            timeout_secs: 1,
        },
        session: SessionConfig {
            input_wait_secs: 1,
            top_n: 3,
            max_age_secs: 3600,
        },
        catalog: CatalogConfig::default(),
    }
}

// =============================================================================
// Fake climate source
// =============================================================================

/// Climate source answering from a script, then from a fallback
pub struct FakeClimateSource {
    script: Mutex<VecDeque<AppResult<ClimateReading>>>,
    fallback: AppResult<ClimateReading>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeClimateSource {
    pub fn healthy(reading: ClimateReading) -> Arc<Self> {
        Self::build(Vec::new(), Ok(reading), Duration::ZERO)
    }

    pub fn unavailable() -> Arc<Self> {
        Self::build(
            Vec::new(),
            Err(AppError::ClimateUnavailable("connection refused".into())),
            Duration::ZERO,
        )
    }

    pub fn scripted(script: Vec<AppResult<ClimateReading>>, fallback: AppResult<ClimateReading>) -> Arc<Self> {
        Self::build(script, fallback, Duration::ZERO)
    }

    pub fn slow(reading: ClimateReading, delay: Duration) -> Arc<Self> {
        Self::build(Vec::new(), Ok(reading), delay)
    }

    fn build(
        script: Vec<AppResult<ClimateReading>>,
        fallback: AppResult<ClimateReading>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClimateSource for FakeClimateSource {
    async fn fetch(
        &self,
        _location: &FarmLocation,
        _as_of: Option<DateTime<Utc>>,
    ) -> AppResult<ClimateReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// =============================================================================
// Fake plant identifier
// =============================================================================

pub enum Identification {
    Answer(IdentificationOutcome),
    Fail,
    Hang,
}

pub struct FakeIdentifier {
    behaviour: Identification,
    calls: AtomicUsize,
}

impl FakeIdentifier {
    pub fn identifies(species: &str, confidence: f64) -> Arc<Self> {
        Self::with(Identification::Answer(IdentificationOutcome::Identified(
            PlantIdentificationHint::new(species, confidence),
        )))
    }

    pub fn unidentified() -> Arc<Self> {
        Self::with(Identification::Answer(IdentificationOutcome::Unidentified))
    }

    pub fn failing() -> Arc<Self> {
        Self::with(Identification::Fail)
    }

    pub fn hanging() -> Arc<Self> {
        Self::with(Identification::Hang)
    }

    fn with(behaviour: Identification) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlantIdentifier for FakeIdentifier {
    async fn identify(&self, _photo: &PlantPhoto) -> AppResult<IdentificationOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Identification::Answer(outcome) => Ok(outcome.clone()),
            Identification::Fail => Err(AppError::IdentificationDegraded("model offline".into())),
            Identification::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(IdentificationOutcome::Unidentified)
            }
        }
    }
}

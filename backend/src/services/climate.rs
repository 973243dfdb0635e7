//! Climate snapshot provider
//!
//! Wraps a [`ClimateSource`] with bounds validation, bounded retry and a
//! per-location freshness cache. The cache is the only mutable state shared
//! between sessions.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use shared::{validate_climate_reading, ClimateSnapshot, FarmLocation};
use tokio::sync::RwLock;

use crate::config::{ClimateConfig, RetryPolicy};
use crate::error::{AppError, AppResult};
use crate::external::ClimateSource;

/// Cached snapshot with the time it was fetched
#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: ClimateSnapshot,
    fetched_at: DateTime<Utc>,
}

/// Climate snapshot provider with cache and retry
pub struct ClimateSnapshotProvider {
    source: Arc<dyn ClimateSource>,
    cache: RwLock<HashMap<(Decimal, Decimal), CachedSnapshot>>,
    freshness: Duration,
    retry: RetryPolicy,
}

impl ClimateSnapshotProvider {
    pub fn new(source: Arc<dyn ClimateSource>, freshness: Duration, retry: RetryPolicy) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
            freshness,
            retry,
        }
    }

    pub fn from_config(source: Arc<dyn ClimateSource>, config: &ClimateConfig) -> Self {
        Self::new(source, config.cache_freshness(), config.retry_policy())
    }

    /// Get a validated snapshot for `location`, from cache when fresh
    pub async fn fetch(
        &self,
        location: &FarmLocation,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<ClimateSnapshot> {
        if let Some(snapshot) = self.cached(location, as_of, Utc::now()).await {
            tracing::debug!(
                location = %location.display_name(),
                observed_at = %snapshot.observed_at,
                "Climate cache hit"
            );
            return Ok(snapshot);
        }

        let reading = self.fetch_with_retry(location, as_of).await?;
        let snapshot = validate_climate_reading(&reading, location.clone())?;
        if snapshot.humidity_pct != reading.humidity_pct {
            tracing::debug!(
                reported = reading.humidity_pct,
                clamped = snapshot.humidity_pct,
                "Humidity clamped into [0, 100]"
            );
        }

        self.store(snapshot.clone(), Utc::now()).await;
        Ok(snapshot)
    }

    /// Cached snapshot for `location` if it is fresh at `now`
    ///
    /// When `as_of` is given the snapshot must also have been observed
    /// within the freshness window of that time.
    pub async fn cached(
        &self,
        location: &FarmLocation,
        as_of: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<ClimateSnapshot> {
        let cache = self.cache.read().await;
        let entry = cache.get(&location.grid_key())?;

        if now - entry.fetched_at > self.freshness {
            return None;
        }
        if let Some(at) = as_of {
            let observed = entry.snapshot.observed_at;
            let gap = if at >= observed { at - observed } else { observed - at };
            if gap > self.freshness {
                return None;
            }
        }

        let mut snapshot = entry.snapshot.clone();
        snapshot.location = location.clone();
        Some(snapshot)
    }

    /// Write a snapshot unless the cached one was observed later.
    /// Returns whether the cache was updated.
    pub async fn store(&self, snapshot: ClimateSnapshot, fetched_at: DateTime<Utc>) -> bool {
        let mut cache = self.cache.write().await;
        match cache.entry(snapshot.location.grid_key()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().snapshot.is_newer_than(&snapshot) {
                    tracing::debug!(
                        cached = %occupied.get().snapshot.observed_at,
                        incoming = %snapshot.observed_at,
                        "Discarding stale climate snapshot"
                    );
                    return false;
                }
                occupied.insert(CachedSnapshot {
                    snapshot,
                    fetched_at,
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CachedSnapshot {
                    snapshot,
                    fetched_at,
                });
            }
        }
        true
    }

    async fn fetch_with_retry(
        &self,
        location: &FarmLocation,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<shared::ClimateReading> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.source.fetch(location, as_of).await {
                Ok(reading) => return Ok(reading),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= self.retry.max_attempts => {
                    tracing::warn!(attempt, error = %err, "Climate source exhausted retries");
                    return Err(AppError::ClimateUnavailable(format!(
                        "no response after {} attempts: {}",
                        attempt, err
                    )));
                }
                Err(err) => {
                    let delay = self.retry.backoff_after(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Climate fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

//! Recommendation sessions
//!
//! A session collects a farm location and an optional plant photo, which may
//! arrive in either order, then fetches climate data and identifies the
//! photo concurrently before scoring. State lives in a `watch` channel so
//! `run` can wait on input arrival and cancellation without polling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    ClimateSnapshot, CropRecommendation, CropScoringEngine, FarmLocation, KnowledgeBase,
    PlantIdentificationHint, PlantPhoto, SessionEvent, SessionFailure, SessionOutcome,
    SessionState, SessionStatus, TransitionError,
};
use tokio::sync::{watch, Mutex, RwLock};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::PlantIdentifier;
use crate::services::climate::ClimateSnapshotProvider;

/// Timing and presentation settings for sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// How long `run` waits for both inputs before proceeding
    pub input_wait: Duration,
    /// Deadline for the optional identification call
    pub identification_timeout: Duration,
    /// Recommendations returned by `run`
    pub top_n: usize,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_wait: Duration::from_secs(config.session.input_wait_secs),
            identification_timeout: Duration::from_secs(config.identification.timeout_secs),
            top_n: config.session.top_n.max(1),
        }
    }
}

/// Collaborators shared by every session
#[derive(Clone)]
pub struct SessionContext {
    pub climate: Arc<ClimateSnapshotProvider>,
    pub identifier: Arc<dyn PlantIdentifier>,
    pub knowledge: Arc<KnowledgeBase>,
    pub settings: SessionSettings,
}

/// Read-only view of a session for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<FarmLocation>,
    pub has_photo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climate: Option<ClimateSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant_hint: Option<PlantIdentificationHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SessionFailure>,
    pub result_count: usize,
}

pub struct RecommendationSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    state: watch::Sender<SessionState>,
    run_lock: Mutex<()>,
    ctx: SessionContext,
}

impl RecommendationSession {
    pub fn new(ctx: SessionContext) -> Self {
        let (state, _) = watch::channel(SessionState::Pending);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            state,
            run_lock: Mutex::new(()),
            ctx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> SessionView {
        let state = self.state.borrow();
        let (climate, plant_hint, result_count) = match &*state {
            SessionState::Complete(outcome) => (
                Some(outcome.climate.clone()),
                outcome.hint.clone(),
                outcome.recommendations.len(),
            ),
            _ => (None, None, 0),
        };
        let failure = match &*state {
            SessionState::Failed(failure) => Some(failure.clone()),
            _ => None,
        };

        SessionView {
            id: self.id,
            status: state.status(),
            created_at: self.created_at,
            location: state.location().cloned(),
            has_photo: state.has_photo(),
            climate,
            plant_hint,
            failure,
            result_count,
        }
    }

    /// Store or replace the farm location
    pub fn submit_location(&self, location: FarmLocation) -> AppResult<SessionStatus> {
        tracing::debug!(session_id = %self.id, location = %location.display_name(), "Location submitted");
        self.transition(SessionEvent::LocationSubmitted(location))
            .map(|state| state.status())
    }

    /// Store or replace the plant photo
    pub fn submit_photo(&self, photo: PlantPhoto) -> AppResult<SessionStatus> {
        validate_photo(&photo)?;
        tracing::debug!(session_id = %self.id, "Photo submitted");
        self.transition(SessionEvent::PhotoSubmitted(photo))
            .map(|state| state.status())
    }

    /// Cancel the session. Cancelling twice is a no-op.
    pub fn cancel(&self) -> AppResult<()> {
        if self.state.borrow().is_cancelled() {
            return Ok(());
        }
        self.transition(SessionEvent::Cancelled)?;
        tracing::info!(session_id = %self.id, "Session cancelled");
        Ok(())
    }

    /// Produce the top recommendations
    pub async fn run(&self) -> AppResult<Vec<CropRecommendation>> {
        self.run_limited(Some(self.ctx.settings.top_n)).await
    }

    /// Produce the full ranked catalog
    pub async fn run_full(&self) -> AppResult<Vec<CropRecommendation>> {
        self.run_limited(None).await
    }

    async fn run_limited(&self, limit: Option<usize>) -> AppResult<Vec<CropRecommendation>> {
        let _guard = self.run_lock.lock().await;

        if let Some(result) = self.finished(limit) {
            return result;
        }

        let mut inputs = self.state.subscribe();
        let arrived = tokio::time::timeout(
            self.ctx.settings.input_wait,
            inputs.wait_for(|s| s.has_all_inputs() || s.is_terminal()),
        )
        .await
        .is_ok();
        if !arrived {
            tracing::debug!(session_id = %self.id, "Input wait elapsed, proceeding with available inputs");
        }
        if let Some(result) = self.finished(limit) {
            return result;
        }

        let (location, photo) = match self.transition(SessionEvent::ScoringStarted)? {
            SessionState::Scoring { location, photo } => (location, photo),
            other => {
                return Err(AppError::Internal(format!(
                    "unexpected state {} after scoring started",
                    other.status()
                )))
            }
        };
        // Dropped before the run lock, so the next run sees the rolled back state
        let _scoring = ScoringPass { session: self };
        tracing::info!(
            session_id = %self.id,
            location = %location.display_name(),
            with_photo = photo.is_some(),
            "Scoring started"
        );

        let mut cancelled = self.state.subscribe();
        let (climate, hint) = tokio::select! {
            pair = async {
                tokio::join!(
                    self.ctx.climate.fetch(&location, None),
                    self.identify(photo.as_ref()),
                )
            } => pair,
            _ = cancelled.wait_for(|s| s.is_cancelled()) => {
                tracing::info!(session_id = %self.id, "Cancelled while scoring, discarding upstream results");
                return Err(AppError::SessionCancelled(self.id));
            }
        };

        let snapshot = match climate {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(session_id = %self.id, error = %err, "Climate fetch failed, session failed");
                self.transition(SessionEvent::ScoringFailed(SessionFailure::from(&err)))?;
                return Err(err);
            }
        };

        let recommendations =
            CropScoringEngine::new(&self.ctx.knowledge).score_full(&snapshot, hint.as_ref());
        let delivered = truncated(&recommendations, limit);
        if let Some(top) = recommendations.first() {
            tracing::info!(
                session_id = %self.id,
                top_crop = %top.crop_name,
                confidence = top.confidence,
                "Scoring complete"
            );
        }

        self.transition(SessionEvent::ScoringCompleted(SessionOutcome {
            climate: snapshot,
            hint,
            recommendations,
        }))?;

        Ok(delivered)
    }

    /// Identification hint, or `None` when there is no photo or the
    /// service fails or is too slow
    async fn identify(&self, photo: Option<&PlantPhoto>) -> Option<PlantIdentificationHint> {
        let photo = photo?;
        let timeout = self.ctx.settings.identification_timeout;

        let err = match tokio::time::timeout(timeout, self.ctx.identifier.identify(photo)).await {
            Ok(Ok(outcome)) => return outcome.into_hint(),
            Ok(Err(err)) => err,
            Err(_) => AppError::IdentificationDegraded(format!("no answer within {:?}", timeout)),
        };
        tracing::warn!(session_id = %self.id, error = %err, "Scoring without identification hint");
        None
    }

    /// Result of a session that has already reached a terminal state
    fn finished(&self, limit: Option<usize>) -> Option<AppResult<Vec<CropRecommendation>>> {
        match &*self.state.borrow() {
            SessionState::Complete(outcome) => Some(Ok(truncated(&outcome.recommendations, limit))),
            SessionState::Failed(SessionFailure::Cancelled) => {
                Some(Err(AppError::SessionCancelled(self.id)))
            }
            SessionState::Failed(SessionFailure::ClimateUnavailable { message }) => {
                Some(Err(AppError::ClimateUnavailable(message.clone())))
            }
            SessionState::Failed(SessionFailure::ClimateDataInvalid { message }) => {
                Some(Err(AppError::ClimateDataInvalid(message.clone())))
            }
            _ => None,
        }
    }

    /// Apply `event` and publish the new state to waiters
    fn transition(&self, event: SessionEvent) -> AppResult<SessionState> {
        let mut result = Err(TransitionError::MissingLocation);
        self.state.send_if_modified(|state| match state.apply(event) {
            Ok(next) => {
                result = Ok(next.clone());
                *state = next;
                true
            }
            Err(err) => {
                result = Err(err);
                false
            }
        });
        result.map_err(|err| self.transition_error(err))
    }

    fn transition_error(&self, err: TransitionError) -> AppError {
        if self.state.borrow().is_cancelled() {
            return AppError::SessionCancelled(self.id);
        }
        match err {
            TransitionError::MissingLocation => AppError::Validation {
                field: "location".to_string(),
                message: err.to_string(),
            },
            other => AppError::InvalidStateTransition(other.to_string()),
        }
    }
}

/// Returns a session left in `Scoring` to `AwaitingInputs` when its run
/// stops early, e.g. because the caller dropped the `run` future
struct ScoringPass<'a> {
    session: &'a RecommendationSession,
}

impl Drop for ScoringPass<'_> {
    fn drop(&mut self) {
        let abandoned = self.session.state.send_if_modified(|state| {
            if !matches!(state, SessionState::Scoring { .. }) {
                return false;
            }
            match state.apply(SessionEvent::ScoringAbandoned) {
                Ok(next) => {
                    *state = next;
                    true
                }
                Err(_) => false,
            }
        });
        if abandoned {
            tracing::info!(session_id = %self.session.id, "Scoring abandoned, inputs kept for the next run");
        }
    }
}

fn truncated(recommendations: &[CropRecommendation], limit: Option<usize>) -> Vec<CropRecommendation> {
    let end = limit.map_or(recommendations.len(), |n| n.min(recommendations.len()));
    recommendations[..end].to_vec()
}

/// Reject photos that are empty or not base64
fn validate_photo(photo: &PlantPhoto) -> AppResult<()> {
    let data = photo.image_base64.trim();
    if data.is_empty() {
        return Err(AppError::Validation {
            field: "image_base64".to_string(),
            message: "photo is empty".to_string(),
        });
    }
    STANDARD.decode(data).map_err(|e| AppError::Validation {
        field: "image_base64".to_string(),
        message: format!("photo is not valid base64: {}", e),
    })?;

    if let Some(mime) = &photo.mime_type {
        if !mime.starts_with("image/") {
            return Err(AppError::Validation {
                field: "mime_type".to_string(),
                message: format!("{} is not an image type", mime),
            });
        }
    }
    Ok(())
}

/// In-memory registry of live sessions
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<RecommendationSession>>>,
    ctx: SessionContext,
}

impl SessionRegistry {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ctx,
        }
    }

    pub async fn create(&self) -> Arc<RecommendationSession> {
        let session = Arc::new(RecommendationSession::new(self.ctx.clone()));
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        tracing::info!(session_id = %session.id(), "Session created");
        session
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Arc<RecommendationSession>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::SessionNotFound(id))
    }

    /// Remove a session; a session that is still running is cancelled so
    /// its results are never delivered
    pub async fn take(&self, id: Uuid) -> AppResult<Arc<RecommendationSession>> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(AppError::SessionNotFound(id))?;
        if !session.state.borrow().is_terminal() {
            if let Err(err) = session.cancel() {
                tracing::debug!(session_id = %id, error = %err, "Session finished while being removed");
            }
        }
        Ok(session)
    }

    /// Drop sessions created more than `max_age` ago, cancelling any that
    /// are still open. Returns how many were removed.
    pub async fn prune(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            if session.created_at() >= cutoff {
                return true;
            }
            if let Err(err) = session.cancel() {
                tracing::debug!(session_id = %session.id(), error = %err, "Pruning finished session");
            }
            false
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

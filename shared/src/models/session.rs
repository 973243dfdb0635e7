//! Recommendation session state machine
//!
//! A session moves through
//! `Pending -> AwaitingInputs -> Scoring -> Complete | Failed`, driven only by
//! discrete [`SessionEvent`]s. Inputs may arrive in either order and may be
//! replaced until scoring starts. A scoring pass that is abandoned before it
//! finishes returns the session to `AwaitingInputs` with its inputs intact.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ClimateSnapshot, CropRecommendation, FarmLocation, PlantIdentificationHint};
use crate::types::PlantPhoto;

/// Externally visible session status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    AwaitingInputs,
    Scoring,
    Complete,
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::AwaitingInputs => write!(f, "awaiting_inputs"),
            SessionStatus::Scoring => write!(f, "scoring"),
            SessionStatus::Complete => write!(f, "complete"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a session ended in `Failed`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum SessionFailure {
    ClimateUnavailable { message: String },
    ClimateDataInvalid { message: String },
    Cancelled,
}

/// Everything a completed session produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionOutcome {
    pub climate: ClimateSnapshot,
    pub hint: Option<PlantIdentificationHint>,
    /// Full ranked catalog; callers truncate for presentation
    pub recommendations: Vec<CropRecommendation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Pending,
    AwaitingInputs {
        location: Option<FarmLocation>,
        photo: Option<PlantPhoto>,
    },
    Scoring {
        location: FarmLocation,
        photo: Option<PlantPhoto>,
    },
    Complete(SessionOutcome),
    Failed(SessionFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LocationSubmitted(FarmLocation),
    PhotoSubmitted(PlantPhoto),
    ScoringStarted,
    ScoringCompleted(SessionOutcome),
    ScoringFailed(SessionFailure),
    ScoringAbandoned,
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("a location is required before scoring can start")]
    MissingLocation,

    #[error("inputs can no longer be changed once scoring has started")]
    InputsLocked,

    #[error("session is already {0}")]
    AlreadyTerminal(SessionStatus),

    #[error("event {event} is not valid while {status}")]
    Unexpected {
        status: SessionStatus,
        event: &'static str,
    },
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::LocationSubmitted(_) => "location_submitted",
            SessionEvent::PhotoSubmitted(_) => "photo_submitted",
            SessionEvent::ScoringStarted => "scoring_started",
            SessionEvent::ScoringCompleted(_) => "scoring_completed",
            SessionEvent::ScoringFailed(_) => "scoring_failed",
            SessionEvent::ScoringAbandoned => "scoring_abandoned",
            SessionEvent::Cancelled => "cancelled",
        }
    }
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Pending => SessionStatus::Pending,
            SessionState::AwaitingInputs { .. } => SessionStatus::AwaitingInputs,
            SessionState::Scoring { .. } => SessionStatus::Scoring,
            SessionState::Complete(_) => SessionStatus::Complete,
            SessionState::Failed(_) => SessionStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete(_) | SessionState::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionState::Failed(SessionFailure::Cancelled))
    }

    /// True once both the location and the photo are present
    pub fn has_all_inputs(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingInputs {
                location: Some(_),
                photo: Some(_)
            }
        )
    }

    pub fn location(&self) -> Option<&FarmLocation> {
        match self {
            SessionState::AwaitingInputs { location, .. } => location.as_ref(),
            SessionState::Scoring { location, .. } => Some(location),
            SessionState::Complete(outcome) => Some(&outcome.climate.location),
            _ => None,
        }
    }

    pub fn has_photo(&self) -> bool {
        match self {
            SessionState::AwaitingInputs { photo, .. } | SessionState::Scoring { photo, .. } => {
                photo.is_some()
            }
            _ => false,
        }
    }

    /// Compute the state that follows `event`, leaving `self` untouched
    pub fn apply(&self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::AlreadyTerminal(self.status()));
        }

        match (self, event) {
            (_, SessionEvent::Cancelled) => Ok(SessionState::Failed(SessionFailure::Cancelled)),

            (SessionState::Pending, SessionEvent::LocationSubmitted(location)) => {
                Ok(SessionState::AwaitingInputs {
                    location: Some(location),
                    photo: None,
                })
            }
            (SessionState::Pending, SessionEvent::PhotoSubmitted(photo)) => {
                Ok(SessionState::AwaitingInputs {
                    location: None,
                    photo: Some(photo),
                })
            }
            (SessionState::AwaitingInputs { photo, .. }, SessionEvent::LocationSubmitted(location)) => {
                Ok(SessionState::AwaitingInputs {
                    location: Some(location),
                    photo: photo.clone(),
                })
            }
            (SessionState::AwaitingInputs { location, .. }, SessionEvent::PhotoSubmitted(photo)) => {
                Ok(SessionState::AwaitingInputs {
                    location: location.clone(),
                    photo: Some(photo),
                })
            }

            (SessionState::Pending, SessionEvent::ScoringStarted)
            | (SessionState::AwaitingInputs { location: None, .. }, SessionEvent::ScoringStarted) => {
                Err(TransitionError::MissingLocation)
            }
            (
                SessionState::AwaitingInputs {
                    location: Some(location),
                    photo,
                },
                SessionEvent::ScoringStarted,
            ) => Ok(SessionState::Scoring {
                location: location.clone(),
                photo: photo.clone(),
            }),

            (SessionState::Scoring { .. }, SessionEvent::LocationSubmitted(_))
            | (SessionState::Scoring { .. }, SessionEvent::PhotoSubmitted(_)) => {
                Err(TransitionError::InputsLocked)
            }
            (SessionState::Scoring { .. }, SessionEvent::ScoringCompleted(outcome)) => {
                Ok(SessionState::Complete(outcome))
            }
            (SessionState::Scoring { .. }, SessionEvent::ScoringFailed(failure)) => {
                Ok(SessionState::Failed(failure))
            }
            (SessionState::Scoring { location, photo }, SessionEvent::ScoringAbandoned) => {
                Ok(SessionState::AwaitingInputs {
                    location: Some(location.clone()),
                    photo: photo.clone(),
                })
            }

            (state, event) => Err(TransitionError::Unexpected {
                status: state.status(),
                event: event.name(),
            }),
        }
    }
}

//! Error handling for the Crop Advisor backend
//!
//! Every failure surfaced over HTTP goes through [`AppError`], which renders
//! a consistent `{"error": {"code", "message", "field"?}}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{DomainError, SessionFailure};
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug, Clone)]
pub enum AppError {
    // User input errors
    #[error("Invalid coordinates: {field} {message}")]
    InvalidCoordinates { field: String, message: String },

    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    // Upstream climate errors
    #[error("Climate data unavailable: {0}")]
    ClimateUnavailable(String),

    #[error("Climate data invalid: {0}")]
    ClimateDataInvalid(String),

    // Identification never fails a session; this is only logged
    #[error("Plant identification degraded: {0}")]
    IdentificationDegraded(String),

    // Session errors
    #[error("Session {0} was cancelled")]
    SessionCancelled(Uuid),

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Upstream failures worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::ClimateUnavailable(_))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidCoordinates { field, message } => {
                AppError::InvalidCoordinates { field, message }
            }
            err @ DomainError::ClimateDataInvalid { .. } => {
                AppError::ClimateDataInvalid(err.to_string())
            }
            DomainError::InvalidKnowledgeBase(msg) => AppError::Configuration(msg),
        }
    }
}

impl From<&AppError> for SessionFailure {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::ClimateDataInvalid(message) => SessionFailure::ClimateDataInvalid {
                message: message.clone(),
            },
            AppError::SessionCancelled(_) => SessionFailure::Cancelled,
            other => SessionFailure::ClimateUnavailable {
                message: other.to_string(),
            },
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidCoordinates { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_COORDINATES", format!("{} {}", field, message))
                    .with_field(field),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field),
            ),
            AppError::ClimateUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new(
                    "CLIMATE_UNAVAILABLE",
                    "Climate data is temporarily unavailable, please try again later",
                ),
            ),
            AppError::ClimateDataInvalid(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("CLIMATE_DATA_INVALID", msg.clone()),
            ),
            AppError::IdentificationDegraded(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("IDENTIFICATION_DEGRADED", msg.clone()),
            ),
            AppError::SessionCancelled(id) => (
                StatusCode::GONE,
                ErrorDetail::new("SESSION_CANCELLED", format!("Session {} was cancelled", id)),
            ),
            AppError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("Session {} not found", id)),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone()),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("CONFIGURATION_ERROR", format!("Configuration error: {}", msg)),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

//! Domain errors raised by validation and knowledge base loading

use thiserror::Error;

/// Errors produced by the pure domain layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Coordinates were missing, non-numeric or out of range
    #[error("Invalid coordinates: {field} {message}")]
    InvalidCoordinates { field: String, message: String },

    /// Upstream climate values violate physical bounds beyond tolerance
    #[error("Climate data invalid: {field}={value} ({message})")]
    ClimateDataInvalid {
        field: String,
        value: f64,
        message: String,
    },

    /// Crop knowledge base failed load-time checks
    #[error("Invalid knowledge base: {0}")]
    InvalidKnowledgeBase(String),
}

impl DomainError {
    pub(crate) fn coordinates(field: &str, message: impl Into<String>) -> Self {
        DomainError::InvalidCoordinates {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn climate(field: &str, value: f64, message: impl Into<String>) -> Self {
        DomainError::ClimateDataInvalid {
            field: field.to_string(),
            value,
            message: message.into(),
        }
    }

    pub(crate) fn knowledge_base(message: impl Into<String>) -> Self {
        DomainError::InvalidKnowledgeBase(message.into())
    }
}

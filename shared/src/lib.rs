//! Shared types and domain logic for the Crop Advisor platform
//!
//! This crate contains the pure recommendation core shared between the
//! backend, the browser front end (via WASM), and tests: coordinate
//! resolution, climate validation, the crop knowledge base and the
//! crop scoring engine.

pub mod error;
pub mod models;
pub mod scoring;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use scoring::*;
pub use types::*;
pub use validation::*;

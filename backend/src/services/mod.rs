//! Business logic services for the Crop Advisor backend

pub mod catalog;
pub mod climate;
pub mod session;

pub use catalog::load_knowledge_base;
pub use climate::ClimateSnapshotProvider;
pub use session::{
    RecommendationSession, SessionContext, SessionRegistry, SessionSettings, SessionView,
};

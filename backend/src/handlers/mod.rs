//! HTTP handlers

pub mod catalog;
pub mod climate;
pub mod health;
pub mod recommendation;
pub mod session;

pub use catalog::get_catalog;
pub use climate::{get_climate, list_regions};
pub use health::health_check;
pub use recommendation::score_recommendations;
pub use session::{
    cancel_session, create_session, get_session, run_session, submit_location, submit_photo,
};

//! Route definitions for the Crop Advisor API

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/sessions", session_routes())
        .route("/climate", get(handlers::get_climate))
        .route("/regions", get(handlers::list_regions))
        .route("/recommendations/score", post(handlers::score_recommendations))
        .route("/catalog", get(handlers::get_catalog))
}

/// Recommendation session routes
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_session))
        .route(
            "/:session_id",
            get(handlers::get_session).delete(handlers::cancel_session),
        )
        .route("/:session_id/location", put(handlers::submit_location))
        .route("/:session_id/photo", put(handlers::submit_photo))
        .route("/:session_id/run", post(handlers::run_session))
}

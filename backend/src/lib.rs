//! Crop Advisor backend
//!
//! Turns a farm's location, current climate conditions and an optional
//! plant photo into a ranked, explained list of recommended crops.

use std::sync::Arc;

use axum::{routing::get, Router};
use shared::KnowledgeBase;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;

use error::AppResult;
use external::{ClimateApiClient, ClimateSource, PlantIdClient, PlantIdentifier};
use services::{ClimateSnapshotProvider, SessionContext, SessionRegistry, SessionSettings};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub climate: Arc<ClimateSnapshotProvider>,
    pub knowledge: Arc<KnowledgeBase>,
}

impl AppState {
    /// Build state with the production API clients
    pub fn from_config(config: Config) -> AppResult<Self> {
        let knowledge = services::load_knowledge_base(&config.catalog)?;
        let climate_source = Arc::new(ClimateApiClient::new(&config.climate)?);
        let identifier = Arc::new(PlantIdClient::new(&config.identification)?);
        Ok(Self::with_sources(config, knowledge, climate_source, identifier))
    }

    /// Build state around arbitrary upstream sources
    pub fn with_sources(
        config: Config,
        knowledge: KnowledgeBase,
        climate_source: Arc<dyn ClimateSource>,
        identifier: Arc<dyn PlantIdentifier>,
    ) -> Self {
        let climate = Arc::new(ClimateSnapshotProvider::from_config(
            climate_source,
            &config.climate,
        ));
        let knowledge = Arc::new(knowledge);
        let sessions = Arc::new(SessionRegistry::new(SessionContext {
            climate: climate.clone(),
            identifier,
            knowledge: knowledge.clone(),
            settings: SessionSettings::from_config(&config),
        }));

        Self {
            config: Arc::new(config),
            sessions,
            climate,
            knowledge,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Crop Advisor API v1"
}

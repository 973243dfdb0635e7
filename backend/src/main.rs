//! Crop Advisor - Backend Server
//!
//! Serves crop recommendations to the farmer-facing web front end.

use std::{net::SocketAddr, time::Duration};

use crop_advisor::{create_app, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crop_advisor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Crop Advisor Server");
    tracing::info!("Environment: {}", config.environment);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let max_age = chrono::Duration::seconds(config.session.max_age_secs as i64);

    let state = AppState::from_config(config)?;

    // Sweep abandoned sessions
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sessions.prune(max_age).await;
            if removed > 0 {
                tracing::info!(removed, "Discarded expired sessions");
            }
        }
    });

    let app = create_app(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

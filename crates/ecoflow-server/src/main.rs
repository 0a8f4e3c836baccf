//! Ecoflow server - always-on backend for dynamic ecological capacity and
//! alerting.

mod api;
mod backoff;
mod config;
mod ingest;
mod persistence;
mod state;

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::ingest::provider::OpenMeteoProvider;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ecoflow_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting ecoflow server...");

    let config = Config::from_env();
    let port = config.server_port;
    let provider = Arc::new(OpenMeteoProvider::new(
        config.weather_url.clone(),
        Duration::from_secs(config.ingest_timeout_s),
    ));
    let state = AppState::new(config).await?;

    // Start background weather ingest
    tokio::spawn(ingest::weather_loop::run_weather_loop(
        state.clone(),
        provider,
    ));

    // Build the app
    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

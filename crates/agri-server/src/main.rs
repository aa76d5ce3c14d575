//! AgriWeb server - geospatial aggregation and report service

use agri_server::api::{self, request_id};
use agri_server::config::Config;
use agri_server::state::AppState;
use anyhow::Result;
use axum::{middleware, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // AGRI_LOG_FORMAT=json switches to one JSON object per line
    let json_logs = std::env::var("AGRI_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("agri_server=debug".parse()?))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting AgriWeb server...");

    let config = Config::from_env();
    let port = config.server_port;
    let maps_route = format!("/{}", config.map_url_prefix.trim_matches('/'));
    tokio::fs::create_dir_all(&config.map_dir).await?;
    let maps_dir = ServeDir::new(&config.map_dir);
    let state = Arc::new(AppState::new(config.clone())?);

    let app = api::routes(&config)
        .route("/health", get(|| async { "OK" }))
        .nest_service(&maps_route, maps_dir)
        .with_state(state)
        .layer(middleware::from_fn(request_id::ensure_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);
    tracing::info!("Serving rendered maps from {} at {}", config.map_dir.display(), maps_route);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

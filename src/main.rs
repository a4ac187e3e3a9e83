//! encore-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use encore_gateway::api;
use encore_gateway::app_state::AppState;
use encore_gateway::config::GatewayConfig;
use encore_gateway::domain::EventBus;
use encore_gateway::persistence::StreamStore;
use encore_gateway::persistence::memory::MemoryStore;
use encore_gateway::persistence::postgres::PostgresStore;
use encore_gateway::service::{GraduationService, SessionService};
use encore_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .context("loading configuration")?;
    tracing::info!(addr = %config.listen_addr, "starting encore-gateway");

    // Build the store
    let store: Arc<dyn StreamStore> = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("connecting to postgres")?;
        store.init_schema().await.context("initializing schema")?;
        tracing::info!("postgres store ready");
        Arc::new(store)
    } else {
        tracing::info!("persistence disabled; using in-memory store");
        Arc::new(MemoryStore::new())
    };

    // Build domain and service layers
    let event_bus = EventBus::new(config.event_bus_capacity);
    let session_service = Arc::new(SessionService::new(Arc::clone(&store), event_bus.clone()));
    let graduation_service = Arc::new(GraduationService::new(
        Arc::clone(&store),
        event_bus.clone(),
        config.graduation_threshold,
    ));

    // Build application state
    let app_state = AppState {
        session_service,
        graduation_service,
        event_bus,
        chat_history_limit: config.chat_history_limit,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

//! Switchboard API Server Entry Point
//!
//! Bootstraps configuration from the environment, wires the components
//! together (dependency injection, no ambient singletons), spawns the
//! background sweeper, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use switchboard_api::jobs::{sweeper_task, SweeperConfig, SweeperMetrics};
use switchboard_api::{
    create_api_router, AgentCoordinator, ApiError, ApiResult, AppState, HttpTransport,
    Orchestrator, RequestRouter, ServiceRegistry, ServiceTransport,
};
use switchboard_context::ContextStore;
use switchboard_core::{ContextConfig, CoordinatorConfig, RegistryConfig, RouterConfig};

use switchboard_api::constants::{DEFAULT_BIND_HOST, DEFAULT_BIND_PORT};

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = Arc::new(ServiceRegistry::new(RegistryConfig::from_env()));
    let contexts = Arc::new(ContextStore::new(ContextConfig::from_env()));
    let coordinator = Arc::new(AgentCoordinator::new(CoordinatorConfig::from_env()));

    let router_config = RouterConfig::from_env();
    let transport: Arc<dyn ServiceTransport> = Arc::new(HttpTransport::new(&router_config));
    let router = Arc::new(RequestRouter::new(
        Arc::clone(&registry),
        transport,
        router_config,
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&router),
        Arc::clone(&contexts),
        Arc::clone(&coordinator),
    ));

    // Background sweeper: stale services, expired contexts, lost agents.
    let sweeper_metrics = Arc::new(SweeperMetrics::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(sweeper_task(
        Arc::clone(&registry),
        Arc::clone(&contexts),
        Arc::clone(&coordinator),
        SweeperConfig::from_env(),
        Arc::clone(&sweeper_metrics),
        shutdown_rx,
    ));

    let state = AppState::new(
        registry,
        contexts,
        router,
        coordinator,
        orchestrator,
        sweeper_metrics,
    );
    let app: Router = create_api_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Switchboard API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host =
        std::env::var("SWITCHBOARD_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("SWITCHBOARD_PORT").ok())
        .unwrap_or_else(|| DEFAULT_BIND_PORT.to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}

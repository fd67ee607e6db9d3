//! REST API Routes Module
//!
//! All Switchboard HTTP route handlers:
//! - /route - orchestrated capability routing
//! - /heartbeat - service and agent liveness
//! - /services, /agents - registration surface
//! - /tasks, /workflows - coordinated work lifecycle
//! - /stats, /health - observability
//! - CORS support for browser-based admin clients

pub mod agents;
pub mod health;
pub mod heartbeat;
pub mod route;
pub mod services;
pub mod stats;
pub mod tasks;
pub mod workflows;

use std::time::Duration;

use axum::{
    http::{header, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::constants::DEFAULT_CORS_MAX_AGE_SECS;
use crate::state::AppState;

/// Compose every route group into the application router.
pub fn create_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any)
        .max_age(Duration::from_secs(DEFAULT_CORS_MAX_AGE_SECS));

    let router = Router::new()
        .merge(route::create_router())
        .merge(heartbeat::create_router())
        .merge(services::create_router())
        .merge(agents::create_router())
        .merge(tasks::create_router())
        .merge(workflows::create_router())
        .merge(stats::create_router())
        .merge(health::create_router());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

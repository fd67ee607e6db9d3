//! Stats Endpoint
//!
//! Read-only counters from every component: per-capability router metrics,
//! per-kind agent utilization, context store activity, and sweep totals.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{ContextStatsBody, StatsResponse};

/// GET /stats - Orchestrator-wide counters
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Stats",
    responses(
        (status = 200, description = "Current counters", body = StatsResponse),
        (status = 500, description = "Coordinator state unavailable", body = ApiError),
    ),
)]
pub async fn stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let contexts = state.contexts.stats();
    let response = StatsResponse {
        capabilities: state.router.stats_snapshot(),
        coordinator: state.coordinator.snapshot()?,
        contexts: ContextStatsBody {
            hits: contexts.hits,
            misses: contexts.misses,
            evictions: contexts.evictions,
            entries: contexts.entries,
            hit_rate: contexts.hit_rate(),
        },
        sweeper: state.sweeper_metrics.snapshot(),
    };
    Ok(Json(response))
}

/// Create the stats router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

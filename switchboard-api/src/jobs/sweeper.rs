//! Periodic Sweep Background Task
//!
//! One background task drives every time-based state change in the
//! orchestrator, so nothing depends on request traffic arriving:
//!
//! - services silent past the staleness window are demoted to unreachable
//! - expired context entries are evicted to bound memory
//! - agents past their liveness deadline are marked offline and their
//!   in-flight tasks forced back to the pending queue for reassignment
//!
//! The task runs until the shutdown signal is received on the watch
//! channel. Missed ticks are skipped rather than bursted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use switchboard_context::ContextStore;

use crate::constants::DEFAULT_SWEEP_INTERVAL_SECS;
use crate::services::{AgentCoordinator, ServiceRegistry};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the sweep task.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to run one sweep cycle (default: 10 seconds)
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl SweeperConfig {
    /// Read from `SWITCHBOARD_SWEEP_INTERVAL_SECS`.
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_secs(
                std::env::var("SWITCHBOARD_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            ),
        }
    }

    /// Tight cadence for development/testing.
    pub fn development() -> Self {
        Self {
            interval: Duration::from_millis(250),
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters tracking sweep activity since startup.
#[derive(Debug, Default)]
pub struct SweeperMetrics {
    /// Services demoted to unreachable
    pub services_demoted: AtomicU64,

    /// Context entries evicted by the sweep
    pub contexts_evicted: AtomicU64,

    /// Agents marked offline (their tasks reclaimed)
    pub agents_reclaimed: AtomicU64,

    /// Sweep cycles completed
    pub sweep_cycles: AtomicU64,

    /// Errors encountered during sweeps
    pub sweep_errors: AtomicU64,
}

impl SweeperMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a current snapshot of all counters.
    pub fn snapshot(&self) -> SweeperSnapshot {
        SweeperSnapshot {
            services_demoted: self.services_demoted.load(Ordering::Relaxed),
            contexts_evicted: self.contexts_evicted.load(Ordering::Relaxed),
            agents_reclaimed: self.agents_reclaimed.load(Ordering::Relaxed),
            sweep_cycles: self.sweep_cycles.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sweep counters at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SweeperSnapshot {
    pub services_demoted: u64,
    pub contexts_evicted: u64,
    pub agents_reclaimed: u64,
    pub sweep_cycles: u64,
    pub sweep_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run the sweep loop until shutdown. Returns the metrics collected over
/// the task's lifetime.
pub async fn sweeper_task(
    registry: Arc<ServiceRegistry>,
    contexts: Arc<ContextStore>,
    coordinator: Arc<AgentCoordinator>,
    config: SweeperConfig,
    metrics: Arc<SweeperMetrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<SweeperMetrics> {
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_ms = config.interval.as_millis() as u64,
        "Sweeper task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Sweeper task shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                sweep_once(&registry, &contexts, &coordinator, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        services_demoted = snapshot.services_demoted,
        contexts_evicted = snapshot.contexts_evicted,
        agents_reclaimed = snapshot.agents_reclaimed,
        sweep_cycles = snapshot.sweep_cycles,
        "Sweeper task completed"
    );

    metrics
}

/// Perform one sweep cycle.
fn sweep_once(
    registry: &ServiceRegistry,
    contexts: &ContextStore,
    coordinator: &AgentCoordinator,
    metrics: &SweeperMetrics,
) {
    metrics.sweep_cycles.fetch_add(1, Ordering::Relaxed);
    let now = Utc::now();

    let demoted = registry.sweep_stale(now);
    if demoted > 0 {
        metrics.services_demoted.fetch_add(demoted, Ordering::Relaxed);
    }

    let evicted = contexts.sweep();
    if evicted > 0 {
        metrics.contexts_evicted.fetch_add(evicted, Ordering::Relaxed);
    }

    match coordinator.reclaim_lost_agents(now) {
        Ok(reclaimed) if reclaimed > 0 => {
            metrics.agents_reclaimed.fetch_add(reclaimed, Ordering::Relaxed);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "Agent reclaim failed during sweep");
            metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    if demoted > 0 || evicted > 0 {
        tracing::info!(
            services_demoted = demoted,
            contexts_evicted = evicted,
            "Sweep cycle completed"
        );
    } else {
        tracing::trace!("Sweep cycle completed with nothing to do");
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! Per-component configuration types.
//!
//! Each component receives its own config struct at construction time; the
//! hosting process builds them once (typically via `from_env`) and passes
//! them down explicitly. No component reads the environment on its own.

use std::time::Duration;

/// Default staleness window before a silent service is demoted (seconds).
pub const DEFAULT_SERVICE_STALENESS_SECS: u64 = 90;

/// Default TTL for context entries (seconds).
pub const DEFAULT_CONTEXT_TTL_SECS: u64 = 600;

/// Default timeout for one downstream dispatch (seconds).
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 10;

/// Default maximum execution attempts per task.
pub const DEFAULT_MAX_TASK_ATTEMPTS: u32 = 3;

/// Default agent heartbeat interval (seconds). An agent silent for two
/// intervals is treated as lost.
pub const DEFAULT_AGENT_HEARTBEAT_SECS: u64 = 15;

fn env_secs(var: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(var)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Configuration for the service registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// A service silent longer than this is demoted to unreachable by the
    /// background sweep (never by the read path).
    pub staleness_window: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            staleness_window: Duration::from_secs(DEFAULT_SERVICE_STALENESS_SECS),
        }
    }
}

impl RegistryConfig {
    /// Read from `SWITCHBOARD_SERVICE_STALENESS_SECS`.
    pub fn from_env() -> Self {
        Self {
            staleness_window: env_secs(
                "SWITCHBOARD_SERVICE_STALENESS_SECS",
                DEFAULT_SERVICE_STALENESS_SECS,
            ),
        }
    }
}

// ============================================================================
// CONTEXT STORE
// ============================================================================

/// Configuration for the context store.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// TTL applied when the caller does not specify one. Sliding: every
    /// write pushes `expires_at` forward by this much.
    pub default_ttl: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_CONTEXT_TTL_SECS),
        }
    }
}

impl ContextConfig {
    /// Read from `SWITCHBOARD_CONTEXT_TTL_SECS`.
    pub fn from_env() -> Self {
        Self {
            default_ttl: env_secs("SWITCHBOARD_CONTEXT_TTL_SECS", DEFAULT_CONTEXT_TTL_SECS),
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Configuration for the request router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Bound on a single downstream dispatch. Exceeding it counts as a
    /// transport failure and triggers the one-retry path.
    pub dispatch_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
        }
    }
}

impl RouterConfig {
    /// Read from `SWITCHBOARD_DISPATCH_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self {
            dispatch_timeout: env_secs(
                "SWITCHBOARD_DISPATCH_TIMEOUT_SECS",
                DEFAULT_DISPATCH_TIMEOUT_SECS,
            ),
        }
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

/// Configuration for the agent coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Execution attempts before a task becomes terminally failed.
    pub max_task_attempts: u32,
    /// Expected heartbeat cadence for agents.
    pub heartbeat_interval: Duration,
}

impl CoordinatorConfig {
    /// An agent is lost after missing two heartbeat windows.
    pub fn liveness_deadline(&self) -> Duration {
        self.heartbeat_interval * 2
    }

    /// Read from `SWITCHBOARD_MAX_TASK_ATTEMPTS` and
    /// `SWITCHBOARD_AGENT_HEARTBEAT_SECS`.
    pub fn from_env() -> Self {
        Self {
            max_task_attempts: std::env::var("SWITCHBOARD_MAX_TASK_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_TASK_ATTEMPTS),
            heartbeat_interval: env_secs(
                "SWITCHBOARD_AGENT_HEARTBEAT_SECS",
                DEFAULT_AGENT_HEARTBEAT_SECS,
            ),
        }
    }

    /// Short windows for development/testing.
    pub fn development() -> Self {
        Self {
            max_task_attempts: 2,
            heartbeat_interval: Duration::from_secs(2),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_task_attempts: DEFAULT_MAX_TASK_ATTEMPTS,
            heartbeat_interval: Duration::from_secs(DEFAULT_AGENT_HEARTBEAT_SECS),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! Constants for the Switchboard API
//!
//! Centralizing constants makes them easy to find, modify, and test.

// ============================================================================
// SERVER
// ============================================================================

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_BIND_PORT: u16 = 3000;

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// SWEEPER
// ============================================================================

/// Default sweep cadence in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10;

// ============================================================================
// ROUTER
// ============================================================================

/// Internal retry budget for a routed request: the first dispatch plus one
/// retry against a different healthy entry.
pub const MAX_DISPATCH_ATTEMPTS: usize = 2;

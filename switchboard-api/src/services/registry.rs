//! Service Registry
//!
//! The typed registry of backend tool servers, keyed by service id with a
//! closed capability enumeration. This replaces the ad hoc
//! service-name-to-URL maps of earlier iterations: every entry is checked
//! against the capability set at the boundary, and health state is mutated
//! only by heartbeat processing and the background staleness sweep.
//!
//! Reads are side-effect-free so tests can call `resolve` repeatedly
//! without disturbing state.

use chrono::Utc;
use dashmap::DashMap;

use switchboard_core::{
    Capability, EntityId, HealthState, RegistryConfig, RegistryError, ServiceEntry, Timestamp,
};

/// In-memory service registry. One instance per hosting process.
#[derive(Debug)]
pub struct ServiceRegistry {
    entries: DashMap<EntityId, ServiceEntry>,
    config: RegistryConfig,
}

impl ServiceRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Insert or replace a service entry keyed by its id.
    pub fn register(&self, entry: ServiceEntry) -> ServiceEntry {
        tracing::info!(
            service_id = %entry.service_id,
            capability = %entry.capability,
            base_address = %entry.base_address,
            "Service registered"
        );
        self.entries.insert(entry.service_id, entry.clone());
        entry
    }

    /// Resolve one healthy entry for the capability.
    ///
    /// Deterministic rule: among Healthy entries, prefer the most recent
    /// successful heartbeat; entries that never heartbeated rank last.
    pub fn resolve(&self, capability: Capability) -> Result<ServiceEntry, RegistryError> {
        self.entries
            .iter()
            .filter(|e| e.capability == capability && e.health.is_routable())
            .max_by_key(|e| (e.last_heartbeat_at, e.service_id))
            .map(|e| e.value().clone())
            .ok_or(RegistryError::NoAvailableService { capability })
    }

    /// All healthy entries for the capability, in stable id order.
    ///
    /// The router's rotation pointer indexes into this list, so the order
    /// must not depend on heartbeat recency.
    pub fn resolve_all(&self, capability: Capability) -> Vec<ServiceEntry> {
        let mut healthy: Vec<ServiceEntry> = self
            .entries
            .iter()
            .filter(|e| e.capability == capability && e.health.is_routable())
            .map(|e| e.value().clone())
            .collect();
        healthy.sort_by_key(|e| e.service_id);
        healthy
    }

    /// Record a heartbeat: refresh `last_heartbeat_at` and apply the
    /// reported health state.
    pub fn record_heartbeat(
        &self,
        service_id: EntityId,
        reported: HealthState,
    ) -> Result<ServiceEntry, RegistryError> {
        let mut entry = self
            .entries
            .get_mut(&service_id)
            .ok_or(RegistryError::ServiceNotFound { service_id })?;
        entry.last_heartbeat_at = Some(Utc::now());
        entry.health = reported;
        Ok(entry.value().clone())
    }

    /// Idempotent removal.
    pub fn deregister(&self, service_id: EntityId) -> bool {
        let removed = self.entries.remove(&service_id).is_some();
        if removed {
            tracing::info!(service_id = %service_id, "Service deregistered");
        }
        removed
    }

    /// Demote entries silent beyond the staleness window to Unreachable.
    ///
    /// Called only by the background sweeper; the read path never mutates.
    pub fn sweep_stale(&self, now: Timestamp) -> u64 {
        let mut demoted = 0u64;
        for mut entry in self.entries.iter_mut() {
            if entry.health != HealthState::Unreachable
                && entry.is_stale(now, self.config.staleness_window)
            {
                tracing::warn!(
                    service_id = %entry.service_id,
                    capability = %entry.capability,
                    "Demoting silent service to unreachable"
                );
                entry.health = HealthState::Unreachable;
                demoted += 1;
            }
        }
        demoted
    }

    /// Read-only listing of every entry.
    pub fn snapshot(&self) -> Vec<ServiceEntry> {
        let mut entries: Vec<ServiceEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.service_id);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

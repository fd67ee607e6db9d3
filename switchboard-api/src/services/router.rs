//! Request Router
//!
//! Routes a [`RoutedRequest`] to one healthy backend for its capability,
//! with a single internal retry against a *different* healthy entry on
//! transport failure. Load distribution uses a per-capability rotation
//! pointer independent of heartbeat recency, so a consistently-healthy but
//! rarely-pinged entry is never starved.
//!
//! Every routed call updates per-capability counters (requests, failures,
//! average latency). The counters are plain relaxed atomics written after
//! the response is produced; they never block the hot path.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use switchboard_core::{
    Capability, RoutedRequest, RoutedResponse, RouteError, RouterConfig, ServiceEntry,
};

use crate::constants::MAX_DISPATCH_ATTEMPTS;
use crate::services::dispatch::{ServiceTransport, TransportError};
use crate::services::registry::ServiceRegistry;

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Default)]
struct CapabilityCounters {
    total_requests: AtomicU64,
    total_failures: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Read-only snapshot of one capability's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CapabilityStats {
    pub capability: Capability,
    pub total_requests: u64,
    pub total_failures: u64,
    /// Average latency over all routed calls, milliseconds.
    pub avg_latency_ms: u64,
}

fn capability_index(capability: Capability) -> usize {
    match capability {
        Capability::Academic => 0,
        Capability::Resource => 1,
        Capability::Communication => 2,
        Capability::Analytics => 3,
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// The capability router. Holds the registry and the transport seam; both
/// are injected at construction.
pub struct RequestRouter {
    registry: Arc<ServiceRegistry>,
    transport: Arc<dyn ServiceTransport>,
    config: RouterConfig,
    rotation: [AtomicUsize; 4],
    counters: [CapabilityCounters; 4],
}

impl RequestRouter {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        transport: Arc<dyn ServiceTransport>,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            config,
            rotation: Default::default(),
            counters: Default::default(),
        }
    }

    /// Parse a capability tag from the wire. Unknown tags fail immediately
    /// and are never retried.
    pub fn parse_capability(tag: &str) -> Result<Capability, RouteError> {
        Capability::from_db_str(tag).map_err(|e| RouteError::UnknownCapability { tag: e.0 })
    }

    /// Route one request and return its response.
    ///
    /// On transport failure the call is retried exactly once against a
    /// different healthy entry when one exists; a lone entry gets no retry.
    pub async fn route(&self, request: RoutedRequest) -> Result<RoutedResponse, RouteError> {
        let capability = request.capability;
        let candidates = self.registry.resolve_all(capability);
        if candidates.is_empty() {
            self.record(capability, 0, false);
            return Err(RouteError::NoAvailableService { capability });
        }

        let start = self.rotation[capability_index(capability)].fetch_add(1, Ordering::Relaxed);
        let attempts = MAX_DISPATCH_ATTEMPTS.min(candidates.len());
        let started = Instant::now();
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..attempts {
            let entry: &ServiceEntry = &candidates[(start + attempt) % candidates.len()];

            match self.transport.dispatch(entry, &request).await {
                Ok(result) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    self.record(capability, elapsed_ms, true);
                    return Ok(RoutedResponse {
                        request_id: request.request_id,
                        success: true,
                        result: Some(result),
                        error_kind: None,
                        service_id: entry.service_id,
                        processing_time_ms: elapsed_ms,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        request_id = %request.request_id,
                        capability = %capability,
                        service_id = %entry.service_id,
                        attempt = attempt + 1,
                        error = %err,
                        "Dispatch attempt failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.record(capability, elapsed_ms, false);

        match last_error {
            Some(TransportError::Timeout) => Err(RouteError::Timeout {
                capability,
                timeout_ms: self.config.dispatch_timeout.as_millis() as u64,
            }),
            Some(err) => Err(RouteError::ServiceUnavailable {
                capability,
                reason: err.to_string(),
            }),
            // Unreachable: attempts >= 1 always sets last_error on failure.
            None => Err(RouteError::ServiceUnavailable {
                capability,
                reason: "no dispatch attempt was made".to_string(),
            }),
        }
    }

    /// Per-capability counter snapshot for observability.
    pub fn stats_snapshot(&self) -> Vec<CapabilityStats> {
        Capability::ALL
            .iter()
            .map(|&capability| {
                let counters = &self.counters[capability_index(capability)];
                let total_requests = counters.total_requests.load(Ordering::Relaxed);
                let total_latency = counters.total_latency_ms.load(Ordering::Relaxed);
                CapabilityStats {
                    capability,
                    total_requests,
                    total_failures: counters.total_failures.load(Ordering::Relaxed),
                    avg_latency_ms: if total_requests == 0 {
                        0
                    } else {
                        total_latency / total_requests
                    },
                }
            })
            .collect()
    }

    fn record(&self, capability: Capability, latency_ms: u64, success: bool) {
        let counters = &self.counters[capability_index(capability)];
        counters.total_requests.fetch_add(1, Ordering::Relaxed);
        counters.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        if !success {
            counters.total_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use dashmap::DashMap;
    use serde_json::json;
    use std::sync::Mutex;
    use switchboard_core::{new_entity_id, EntityId, HealthState, RegistryConfig};

    /// Scripted transport: per-service outcomes plus a call log.
    #[derive(Default)]
    struct ScriptedTransport {
        failures: DashMap<EntityId, TransportError>,
        calls: Mutex<Vec<EntityId>>,
    }

    #[async_trait]
    impl ServiceTransport for ScriptedTransport {
        async fn dispatch(
            &self,
            entry: &ServiceEntry,
            request: &RoutedRequest,
        ) -> Result<serde_json::Value, TransportError> {
            self.calls.lock().unwrap().push(entry.service_id);
            if let Some(err) = self.failures.get(&entry.service_id) {
                return Err(err.clone());
            }
            Ok(json!({ "echo": request.payload, "served_by": entry.service_id }))
        }
    }

    fn healthy(capability: Capability) -> ServiceEntry {
        let mut entry = ServiceEntry::new(
            new_entity_id(),
            capability,
            "http://backend.internal:8080".to_string(),
        );
        entry.health = HealthState::Healthy;
        entry.last_heartbeat_at = Some(Utc::now());
        entry
    }

    fn setup() -> (Arc<ServiceRegistry>, Arc<ScriptedTransport>, RequestRouter) {
        let registry = Arc::new(ServiceRegistry::new(RegistryConfig::default()));
        let transport = Arc::new(ScriptedTransport::default());
        let router = RequestRouter::new(
            Arc::clone(&registry),
            Arc::clone(&transport) as Arc<dyn ServiceTransport>,
            RouterConfig::default(),
        );
        (registry, transport, router)
    }

    #[tokio::test]
    async fn test_route_success() {
        let (registry, _, router) = setup();
        let entry = registry.register(healthy(Capability::Academic));

        let response = router
            .route(RoutedRequest::new(
                Capability::Academic,
                json!({"student": "s-1"}),
            ))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.service_id, entry.service_id);
        assert!(response.result.is_some());
    }

    #[tokio::test]
    async fn test_route_no_available_service() {
        let (_, _, router) = setup();
        let err = router
            .route(RoutedRequest::new(Capability::Analytics, json!({})))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::NoAvailableService {
                capability: Capability::Analytics
            }
        );
    }

    #[tokio::test]
    async fn test_retry_hits_a_different_entry() {
        let (registry, transport, router) = setup();
        let a = registry.register(healthy(Capability::Resource));
        let b = registry.register(healthy(Capability::Resource));
        transport.failures.insert(
            a.service_id,
            TransportError::Connect {
                reason: "refused".to_string(),
            },
        );
        transport.failures.insert(
            b.service_id,
            TransportError::Connect {
                reason: "refused".to_string(),
            },
        );

        let err = router
            .route(RoutedRequest::new(Capability::Resource, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::ServiceUnavailable { .. }));

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0], calls[1], "retry must pick a different entry");
    }

    #[tokio::test]
    async fn test_retry_recovers_when_second_entry_healthy() {
        let (registry, transport, router) = setup();
        let a = registry.register(healthy(Capability::Resource));
        registry.register(healthy(Capability::Resource));
        transport.failures.insert(
            a.service_id,
            TransportError::Connect {
                reason: "refused".to_string(),
            },
        );

        // Route a few times: whichever rotation slot we start at, the one
        // bad entry is always skipped over.
        for _ in 0..4 {
            let response = router
                .route(RoutedRequest::new(Capability::Resource, json!({})))
                .await
                .unwrap();
            assert!(response.success);
            assert_ne!(response.service_id, a.service_id);
        }
    }

    #[tokio::test]
    async fn test_single_entry_gets_no_retry() {
        let (registry, transport, router) = setup();
        let only = registry.register(healthy(Capability::Communication));
        transport
            .failures
            .insert(only.service_id, TransportError::Timeout);

        let err = router
            .route(RoutedRequest::new(Capability::Communication, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::Timeout { .. }));
        assert_eq!(transport.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rotation_distributes_load() {
        let (registry, transport, router) = setup();
        registry.register(healthy(Capability::Academic));
        registry.register(healthy(Capability::Academic));
        registry.register(healthy(Capability::Academic));

        for _ in 0..9 {
            router
                .route(RoutedRequest::new(Capability::Academic, json!({})))
                .await
                .unwrap();
        }

        let calls = transport.calls.lock().unwrap();
        let mut per_service: std::collections::HashMap<EntityId, usize> = Default::default();
        for id in calls.iter() {
            *per_service.entry(*id).or_default() += 1;
        }
        assert_eq!(per_service.len(), 3);
        for count in per_service.values() {
            assert_eq!(*count, 3, "round-robin should spread evenly");
        }
    }

    #[tokio::test]
    async fn test_counters_track_requests_and_failures() {
        let (registry, transport, router) = setup();
        let entry = registry.register(healthy(Capability::Analytics));

        router
            .route(RoutedRequest::new(Capability::Analytics, json!({})))
            .await
            .unwrap();
        transport
            .failures
            .insert(entry.service_id, TransportError::Timeout);
        router
            .route(RoutedRequest::new(Capability::Analytics, json!({})))
            .await
            .unwrap_err();

        let stats = router.stats_snapshot();
        let analytics = stats
            .iter()
            .find(|s| s.capability == Capability::Analytics)
            .unwrap();
        assert_eq!(analytics.total_requests, 2);
        assert_eq!(analytics.total_failures, 1);

        let academic = stats
            .iter()
            .find(|s| s.capability == Capability::Academic)
            .unwrap();
        assert_eq!(academic.total_requests, 0);
    }

    #[test]
    fn test_parse_capability_rejects_unknown() {
        assert!(RequestRouter::parse_capability("academic").is_ok());
        let err = RequestRouter::parse_capability("astrology").unwrap_err();
        assert_eq!(
            err,
            RouteError::UnknownCapability {
                tag: "astrology".to_string()
            }
        );
    }
}

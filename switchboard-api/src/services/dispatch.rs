//! Downstream dispatch transport
//!
//! The router talks to backend tool servers through the `ServiceTransport`
//! trait so tests can inject fakes without touching the network. The
//! production implementation posts the routed payload to the service's
//! `/invoke` endpoint over HTTP with a bounded timeout.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use switchboard_core::{RoutedRequest, RouterConfig, ServiceEntry};

/// Transport-level failure. The router classifies these into its own error
/// taxonomy; callers never see a raw transport error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Dispatch timed out")]
    Timeout,

    #[error("Connection failed: {reason}")]
    Connect { reason: String },

    #[error("Backend returned status {status}")]
    BadStatus { status: u16 },

    #[error("Backend returned an unparseable body: {reason}")]
    BadBody { reason: String },
}

/// Seam between the router and the wire.
#[async_trait]
pub trait ServiceTransport: Send + Sync {
    /// Forward the request payload to one backend and return its JSON result.
    async fn dispatch(
        &self,
        entry: &ServiceEntry,
        request: &RoutedRequest,
    ) -> Result<serde_json::Value, TransportError>;
}

// ============================================================================
// HTTP TRANSPORT
// ============================================================================

/// HTTP transport on a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &RouterConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.dispatch_timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl ServiceTransport for HttpTransport {
    async fn dispatch(
        &self,
        entry: &ServiceEntry,
        request: &RoutedRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let url = format!("{}/invoke", entry.base_address.trim_end_matches('/'));
        let body = json!({
            "request_id": request.request_id,
            "capability": request.capability,
            "payload": request.payload,
            "caller": request.caller,
            "priority": request.priority,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connect {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::BadStatus {
                status: status.as_u16(),
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::BadBody {
                reason: e.to_string(),
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================

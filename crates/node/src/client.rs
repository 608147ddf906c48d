// Path: crates/node/src/client.rs
//! Sends relays to other servicers. Used by the fisherman to sample its
//! session.

use async_trait::async_trait;
use std::time::Duration;
use viper_types::app::{Relay, RelayResponse};
use viper_types::error::ViperError;

/// The inbound relay route every servicer exposes.
pub const RELAY_PATH: &str = "/v1/client/relay";
/// The inbound dispatch route.
pub const DISPATCH_PATH: &str = "/v1/client/dispatch";

/// Delivers a relay to the servicer at `service_url`.
#[async_trait]
pub trait ServicerClient: Send + Sync {
    /// Sends `relay` and returns the servicer's signed response.
    async fn send_relay(
        &self,
        service_url: &str,
        relay: &Relay,
        timeout: Duration,
    ) -> Result<RelayResponse, ViperError>;
}

/// Posts relays as JSON over `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpServicerClient {
    client: reqwest::Client,
}

impl HttpServicerClient {
    /// A client with a fresh connection pool.
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[async_trait]
impl ServicerClient for HttpServicerClient {
    async fn send_relay(
        &self,
        service_url: &str,
        relay: &Relay,
        timeout: Duration,
    ) -> Result<RelayResponse, ViperError> {
        let url = crate::forwarder::endpoint_url(service_url, RELAY_PATH);
        let response = self
            .client
            .post(&url)
            .json(relay)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ViperError::UpstreamError(format!("{}: {}", url, e)))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ViperError::UpstreamError(format!("{}: reading body: {}", url, e)))?;
        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorEnvelope>(&body)
                .map(|env| format!("{} {}", env.error.code, env.error.message))
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(ViperError::UpstreamError(format!("{} answered {}: {}", url, status, detail)));
        }
        serde_json::from_slice(&body)
            .map_err(|e| ViperError::UpstreamError(format!("{}: malformed relay response: {}", url, e)))
    }
}

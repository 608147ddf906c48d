// Path: crates/api/src/forwarder/mod.rs
//! Outbound forwarding of relay payloads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use viper_types::app::Payload;
use viper_types::error::ViperError;

/// HTTP basic credentials of a hosted chain endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BasicAuth {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// An external chain endpoint this node relays to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostedChain {
    /// The chain identifier.
    pub id: String,
    /// Base URL; the payload path is appended.
    pub url: String,
    /// Optional credentials.
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
}

/// Sends a payload to a hosted chain and returns the response body verbatim.
#[async_trait]
pub trait RelayForwarder: Send + Sync {
    /// Forwards `payload`; failures and timeouts are `UpstreamError`.
    async fn forward(
        &self,
        chain: &HostedChain,
        payload: &Payload,
        timeout: Duration,
    ) -> Result<String, ViperError>;
}

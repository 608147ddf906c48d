// Path: crates/test_utils/src/forwarder.rs
//! A forwarder with scripted per-chain responses.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use viper_api::forwarder::{HostedChain, RelayForwarder};
use viper_types::app::Payload;
use viper_types::error::ViperError;

/// Answers each chain with a fixed body, or an upstream error when unscripted.
#[derive(Debug, Default)]
pub struct MockForwarder {
    responses: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, Payload)>>,
}

impl MockForwarder {
    /// A forwarder with no scripted chains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response body for `chain`.
    pub fn respond(&self, chain: &str, body: &str) {
        self.responses
            .lock()
            .insert(chain.to_string(), body.to_string());
    }

    /// Drops the script for `chain`; later forwards to it fail upstream.
    pub fn silence(&self, chain: &str) {
        self.responses.lock().remove(chain);
    }

    /// Chain ids and payloads forwarded so far.
    pub fn calls(&self) -> Vec<(String, Payload)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RelayForwarder for MockForwarder {
    async fn forward(
        &self,
        chain: &HostedChain,
        payload: &Payload,
        _timeout: Duration,
    ) -> Result<String, ViperError> {
        self.calls.lock().push((chain.id.clone(), payload.clone()));
        self.responses
            .lock()
            .get(&chain.id)
            .cloned()
            .ok_or_else(|| ViperError::UpstreamError(format!("no endpoint scripted for {}", chain.id)))
    }
}

// Path: crates/node/src/forwarder.rs
//! Forwards relay payloads to hosted chain endpoints over HTTP.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::Duration;
use viper_api::forwarder::{HostedChain, RelayForwarder};
use viper_types::app::Payload;
use viper_types::error::ViperError;

/// A `reqwest` client shared by every relay.
#[derive(Debug, Clone, Default)]
pub struct HttpForwarder {
    client: Client,
}

impl HttpForwarder {
    /// A forwarder with a fresh connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// A forwarder over an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// The endpoint URL: the chain's base with the payload path appended.
pub fn endpoint_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, path.trim_start_matches('/')),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn method_of(payload: &Payload) -> Result<Method, ViperError> {
    if payload.method.is_empty() {
        return Ok(Method::POST);
    }
    Method::from_bytes(payload.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| ViperError::UpstreamError(format!("invalid http method {:?}", payload.method)))
}

fn headers_of(payload: &Payload) -> Result<HeaderMap, ViperError> {
    let mut headers = HeaderMap::with_capacity(payload.headers.len() + 1);
    for (name, value) in &payload.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ViperError::UpstreamError(format!("invalid header name {:?}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ViperError::UpstreamError(format!("invalid value for header {}", name)))?;
        headers.insert(name, value);
    }
    if !headers.contains_key(reqwest::header::CONTENT_TYPE) {
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }
    Ok(headers)
}

#[async_trait]
impl RelayForwarder for HttpForwarder {
    async fn forward(
        &self,
        chain: &HostedChain,
        payload: &Payload,
        timeout: Duration,
    ) -> Result<String, ViperError> {
        let url = endpoint_url(&chain.url, &payload.path);
        let mut request = self
            .client
            .request(method_of(payload)?, &url)
            .headers(headers_of(payload)?)
            .timeout(timeout)
            .body(payload.data.clone());
        if let Some(auth) = &chain.basic_auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ViperError::UpstreamError(format!("{} timed out after {:?}", chain.id, timeout))
            } else {
                ViperError::UpstreamError(format!("{}: {}", chain.id, e))
            }
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ViperError::UpstreamError(format!("{}: reading body: {}", chain.id, e)))?;
        if status.is_server_error() {
            return Err(ViperError::UpstreamError(format!("{} answered {}", chain.id, status)));
        }
        Ok(body)
    }
}

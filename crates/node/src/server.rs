// Path: crates/node/src/server.rs
//! The inbound relay and dispatch HTTP routes.

use crate::client::{DISPATCH_PATH, RELAY_PATH};
use crate::relay::{DispatchRequest, DispatchResponse, RelayHandler};
use axum::{
    error_handling::HandleErrorLayer,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use viper_types::app::{Relay, RelayResponse};
use viper_types::error::{ErrorCode, ViperError};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Errors returned by the relay routes as
/// `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug)]
pub enum AppError {
    /// The body is not a valid request.
    BadRequest(String),
    /// The relay or dispatch was rejected.
    Rejected(ViperError),
}

impl From<ViperError> for AppError {
    fn from(e: ViperError) -> Self {
        Self::Rejected(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

fn status_of(e: &ViperError) -> StatusCode {
    match e {
        ViperError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        ViperError::ChainNotSynced => StatusCode::SERVICE_UNAVAILABLE,
        ViperError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        ViperError::State(_) | ViperError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", s),
            AppError::Rejected(e) => (status_of(&e), e.code(), e.to_string()),
        };
        (
            status,
            Json(serde_json::json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}

async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(serde_json::json!({
                "error": { "code": "TIMEOUT", "message": "request timed out" }
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": { "code": "OVERLOADED", "message": err.to_string() }
            })),
        )
    }
}

async fn relay_handler(
    State(handler): State<Arc<RelayHandler>>,
    body: Result<Json<Relay>, JsonRejection>,
) -> Result<Json<RelayResponse>, AppError> {
    let Json(relay) = body?;
    Ok(Json(handler.handle_relay(relay).await?))
}

async fn dispatch_handler(
    State(handler): State<Arc<RelayHandler>>,
    body: Result<Json<DispatchRequest>, JsonRejection>,
) -> Result<Json<DispatchResponse>, AppError> {
    let Json(request) = body?;
    Ok(Json(handler.handle_dispatch(&request)?))
}

/// The relay and dispatch routes. `request_timeout` bounds a whole request,
/// upstream call included.
pub fn router(handler: Arc<RelayHandler>, request_timeout: Duration) -> Router {
    Router::new()
        .route(RELAY_PATH, post(relay_handler))
        .route(DISPATCH_PATH, post(dispatch_handler))
        .with_state(handler)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(map_middleware_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(request_timeout),
        )
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Serves [`router`] on `addr` until `shutdown` resolves.
pub async fn run_server<F>(
    addr: SocketAddr,
    handler: Arc<RelayHandler>,
    request_timeout: Duration,
    shutdown: F,
) -> Result<(), anyhow::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "relay", addr = %listener.local_addr()?, "relay server listening");
    axum::serve(listener, router(handler, request_timeout).into_make_service())
        .with_graceful_shutdown(async {
            shutdown.await;
            tracing::info!(target: "relay", "relay server shutting down");
        })
        .await?;
    Ok(())
}

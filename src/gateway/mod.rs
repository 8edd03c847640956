//! Gateway service: `POST /cep` with `{"cep": "NNNNNNNN"}`
//!
//! Only the input is checked here. A valid postal code is forwarded to the
//! resolver inside the caller's trace and the resolver's answer is relayed
//! back verbatim.

pub mod forward;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::to_bytes,
    extract::{Request, State},
    http::Method,
    response::Response,
    routing::any,
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::GatewayConfig,
    error::ServiceError,
    models::PostalCode,
    telemetry::{ServerSpanLayer, build_http_client},
};

pub use forward::ResolverForwarder;

const USER_AGENT: &str = concat!("cep-weather-gateway/", env!("CARGO_PKG_VERSION"));

/// Shared handler state
#[derive(Clone)]
pub struct GatewayState {
    forwarder: Arc<ResolverForwarder>,
    max_body_bytes: usize,
}

impl GatewayState {
    pub fn new(forwarder: ResolverForwarder, max_body_bytes: usize) -> Self {
        Self {
            forwarder: Arc::new(forwarder),
            max_body_bytes,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let client = build_http_client(USER_AGENT)?;
        let forwarder = ResolverForwarder::new(client, &config.resolver_url, config.timeout());
        Ok(Self::new(forwarder, config.max_body_bytes))
    }
}

/// Request body. Extra members make the body invalid.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CepRequest {
    cep: String,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/cep", any(handle_cep))
        .route_layer(ServerSpanLayer::new("handle_cep"))
        .with_state(state)
}

/// Any verb is routed here so that the 405 answer carries our own body. The
/// verb is checked before the body is touched.
async fn handle_cep(
    State(state): State<GatewayState>,
    request: Request,
) -> Result<Response, ServiceError> {
    if request.method() != Method::POST {
        return Err(ServiceError::MethodNotAllowed);
    }

    // An oversized or broken body cannot hold a valid postal code
    let body = to_bytes(request.into_body(), state.max_body_bytes)
        .await
        .map_err(|e| {
            debug!(error = %e, "Unreadable request body");
            ServiceError::InvalidFormat
        })?;

    let payload: CepRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "Rejected request body");
        ServiceError::InvalidFormat
    })?;
    let postal_code = PostalCode::parse(&payload.cep)?;

    state.forwarder.forward(&postal_code).await
}

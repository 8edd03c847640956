//! Relay of a validated postal code to the resolver service

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::Response,
};
use reqwest_middleware::ClientWithMiddleware;
use tracing::{Span, debug, field::Empty, instrument};

use crate::{error::ServiceError, models::PostalCode, telemetry};

/// Headers that describe a single connection and never cross a relay
const HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Calls `GET {resolver}/weather?cep=..` and hands the resolver's answer back
/// unchanged.
pub struct ResolverForwarder {
    client: ClientWithMiddleware,
    resolver_url: String,
    deadline: Duration,
}

impl ResolverForwarder {
    pub fn new(client: ClientWithMiddleware, resolver_url: &str, deadline: Duration) -> Self {
        Self {
            client,
            resolver_url: resolver_url.trim_end_matches('/').to_string(),
            deadline,
        }
    }

    /// Forward `postal_code` and relay whatever the resolver answers, error
    /// statuses included. Only a failure to obtain an answer within the
    /// deadline is an error here.
    #[instrument(
        name = "forward to resolver",
        skip(self),
        fields(
            cep = %postal_code,
            otel.kind = "client",
            otel.status_code = Empty,
            otel.status_message = Empty,
            http.response.status_code = Empty,
        )
    )]
    pub async fn forward(&self, postal_code: &PostalCode) -> Result<Response, ServiceError> {
        match tokio::time::timeout(self.deadline, self.call_resolver(postal_code)).await {
            Ok(result) => result,
            Err(_) => Err(failure(format!(
                "resolver deadline of {}ms exceeded",
                self.deadline.as_millis()
            ))),
        }
    }

    async fn call_resolver(&self, postal_code: &PostalCode) -> Result<Response, ServiceError> {
        let url = format!("{}/weather?cep={}", self.resolver_url, postal_code);

        let upstream = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failure(format!("resolver request failed: {e}")))?;

        let status = upstream.status();
        let headers = upstream.headers().clone();
        let body = upstream
            .bytes()
            .await
            .map_err(|e| failure(format!("resolver body unreadable: {e}")))?;

        let span = Span::current();
        span.record("http.response.status_code", status.as_u16());
        if status.is_server_error() {
            span.record("otel.status_code", "ERROR");
        }
        debug!(%status, bytes = body.len(), "Resolver answered");

        Ok(relay(status, &headers, body))
    }
}

fn failure(reason: String) -> ServiceError {
    telemetry::record_failure(&reason);
    ServiceError::upstream(reason)
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(name)
}

/// Rebuild the downstream answer as our own response
fn relay(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let relayed = response.headers_mut();
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            relayed.append(name.clone(), value.clone());
        }
    }
    response
}

//! Outbound HTTP client that carries the active trace context.

use anyhow::{Context, Result};
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};

use super::propagation;

/// `reqwest-middleware` hook that writes the current span's context into the
/// headers of every outgoing request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracePropagation;

#[async_trait::async_trait]
impl Middleware for TracePropagation {
    async fn handle(
        &self,
        mut request: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        propagation::inject_context(request.headers_mut());
        next.run(request, extensions).await
    }
}

/// Build the shared client used for every downstream call of a service.
///
/// No client-level timeout is set; callers bound each request pipeline with
/// their own deadline.
pub fn build_http_client(user_agent: &str) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    Ok(ClientBuilder::new(client).with(TracePropagation).build())
}

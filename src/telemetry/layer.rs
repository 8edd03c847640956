use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, field::Empty};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::propagation;

/// Starts a server span around every request, continuing the caller's trace
/// when it sent a `traceparent` header.
///
/// The span is named after `operation` and records the response status. It is
/// closed when the inner future completes or is dropped, so early returns,
/// errors and client disconnects all end it.
///
/// ```ignore
/// let app = Router::new()
///     .route("/weather", get(handle_weather))
///     .route_layer(ServerSpanLayer::new("handle_weather"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ServerSpanLayer {
    operation: &'static str,
}

impl ServerSpanLayer {
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self { operation }
    }
}

impl<S> Layer<S> for ServerSpanLayer {
    type Service = ServerSpanService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ServerSpanService {
            inner: service,
            operation: self.operation,
        }
    }
}

/// This service implements the server span behavior
#[derive(Debug, Clone)]
pub struct ServerSpanService<S> {
    inner: S,
    operation: &'static str,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ServerSpanService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    ReqBody: 'static,
    ResBody: 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let span = tracing::info_span!(
            "request",
            otel.name = self.operation,
            otel.kind = "server",
            otel.status_code = Empty,
            http.request.method = %request.method(),
            url.path = %request.uri().path(),
            http.response.status_code = Empty,
        );
        let _ = span.set_parent(propagation::extract_context(request.headers()));

        let future = span.in_scope(|| self.inner.call(request));

        Box::pin(
            async move {
                let response = future.await?;
                let status = response.status();
                let span = tracing::Span::current();
                span.record("http.response.status_code", status.as_u16());
                if status.is_server_error() {
                    span.record("otel.status_code", "ERROR");
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}

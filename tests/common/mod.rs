//! Shared utilities for the service integration tests.

#![allow(dead_code)]

use std::sync::{Once, OnceLock};

use axum::Router;
use cep_weather::{
    config::{GatewayConfig, ResolverConfig},
    gateway::{self, GatewayState},
    resolver::{self, ResolverState},
    server,
};
use opentelemetry::{global, trace::TracerProvider as _};
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider};
use serde_json::json;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WEATHER_API_KEY: &str = "test-key";

/// Install an OpenTelemetry-backed subscriber so spans carry real trace ids.
/// Nothing is exported.
pub fn install_tracing() {
    static INIT: Once = Once::new();
    static PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

    INIT.call_once(|| {
        global::set_text_map_propagator(TraceContextPropagator::new());
        let provider = PROVIDER.get_or_init(|| SdkTracerProvider::builder().build());
        let tracer = provider.tracer("integration-tests");
        let _ = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init();
    });
}

/// Serve `app` on an ephemeral port and return its base URL
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve_until(listener, app, std::future::pending()));
    format!("http://{addr}")
}

pub async fn spawn_resolver(
    location: &MockServer,
    weather: &MockServer,
    api_key: Option<&str>,
    timeout_ms: u64,
) -> String {
    spawn_resolver_at(&location.uri(), &weather.uri(), api_key, timeout_ms).await
}

pub async fn spawn_resolver_at(
    location_url: &str,
    weather_url: &str,
    api_key: Option<&str>,
    timeout_ms: u64,
) -> String {
    let config = ResolverConfig {
        location_api_url: location_url.to_string(),
        weather_api_url: weather_url.to_string(),
        weather_api_key: api_key.map(str::to_string),
        timeout_ms,
    };
    spawn(resolver::router(ResolverState::from_config(&config).unwrap())).await
}

pub async fn spawn_gateway(resolver_url: &str, timeout_ms: u64) -> String {
    let config = GatewayConfig {
        resolver_url: resolver_url.to_string(),
        timeout_ms,
        ..GatewayConfig::default()
    };
    spawn(gateway::router(GatewayState::from_config(&config).unwrap())).await
}

/// Base URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// ViaCEP answer for a known postal code
pub async fn mount_locality(server: &MockServer, cep: &str, locality: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ws/{cep}/json/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cep": format!("{}-{}", &cep[..5], &cep[5..]),
            "logradouro": "Avenida Paulista",
            "localidade": locality,
            "uf": "SP",
        })))
        .mount(server)
        .await;
}

/// ViaCEP answer for an unknown postal code
pub async fn mount_unknown(server: &MockServer, cep: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ws/{cep}/json/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "erro": "true" })))
        .mount(server)
        .await;
}

pub fn current_weather(temp_c: f64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "location": { "name": "Sao Paulo", "country": "Brazil" },
        "current": { "temp_c": temp_c, "condition": { "text": "Sunny" } },
    }))
}

pub async fn mount_weather(server: &MockServer, locality: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .and(query_param("key", WEATHER_API_KEY))
        .and(query_param("q", locality))
        .and(query_param("aqi", "no"))
        .respond_with(response)
        .mount(server)
        .await;
}

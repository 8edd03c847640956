//! End-to-end tests: gateway in front of a real resolver, providers mocked.

mod common;

use std::time::Duration;

use common::{WEATHER_API_KEY, current_weather, mount_locality, mount_unknown, mount_weather};
use reqwest::{Client, StatusCode};
use serde_json::json;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRACE_ID: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

async fn post_cep(gateway: &str, body: &str) -> (StatusCode, String) {
    let response = Client::new()
        .post(format!("{gateway}/cep"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

/// Location and weather mocks for São Paulo at 22.5 °C
async fn sao_paulo_providers() -> (MockServer, MockServer) {
    let location = MockServer::start().await;
    let weather = MockServer::start().await;
    mount_locality(&location, "01310100", "São Paulo").await;
    mount_weather(&weather, "São Paulo", current_weather(22.5)).await;
    (location, weather)
}

#[tokio::test]
async fn test_round_trip() {
    let (location, weather) = sao_paulo_providers().await;
    let resolver = common::spawn_resolver(&location, &weather, Some(WEATHER_API_KEY), 5_000).await;
    let gateway = common::spawn_gateway(&resolver, 5_000).await;

    let (status, body) = post_cep(&gateway, r#"{"cep":"01310100"}"#).await;

    assert_eq!(status, StatusCode::OK);
    let reading: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        reading,
        json!({ "city": "São Paulo", "temp_C": 22.5, "temp_F": 72.5, "temp_K": 295.5 })
    );
}

#[tokio::test]
async fn test_resolver_not_found_is_relayed() {
    let location = MockServer::start().await;
    let weather = MockServer::start().await;
    mount_unknown(&location, "00000000").await;

    let resolver = common::spawn_resolver(&location, &weather, Some(WEATHER_API_KEY), 5_000).await;
    let gateway = common::spawn_gateway(&resolver, 5_000).await;

    let (status, body) = post_cep(&gateway, r#"{"cep":"00000000"}"#).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "can not find zipcode");
}

#[tokio::test]
async fn test_resolver_timeout_is_relayed() {
    let location = MockServer::start().await;
    let weather = MockServer::start().await;
    mount_locality(&location, "01310100", "São Paulo").await;
    mount_weather(
        &weather,
        "São Paulo",
        current_weather(22.5).set_delay(Duration::from_secs(3)),
    )
    .await;

    let resolver = common::spawn_resolver(&location, &weather, Some(WEATHER_API_KEY), 300).await;
    let gateway = common::spawn_gateway(&resolver, 5_000).await;

    let (status, body) = post_cep(&gateway, r#"{"cep":"01310100"}"#).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "bad gateway");
}

#[tokio::test]
async fn test_missing_api_key_is_relayed() {
    let location = MockServer::start().await;
    let weather = MockServer::start().await;
    mount_locality(&location, "01310100", "São Paulo").await;

    let resolver = common::spawn_resolver(&location, &weather, None, 5_000).await;
    let gateway = common::spawn_gateway(&resolver, 5_000).await;

    let (status, body) = post_cep(&gateway, r#"{"cep":"01310100"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "weather api key missing");
}

#[tokio::test]
async fn test_slow_resolver_is_bad_gateway() {
    let resolver = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&resolver)
        .await;

    let gateway = common::spawn_gateway(&resolver.uri(), 300).await;
    let (status, body) = post_cep(&gateway, r#"{"cep":"01310100"}"#).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "bad gateway");
}

#[tokio::test]
async fn test_resolver_headers_are_relayed() {
    let resolver = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-resolver", "yes")
                .set_body_raw(r#"{"city":"Recife"}"#, "application/json"),
        )
        .mount(&resolver)
        .await;

    let gateway = common::spawn_gateway(&resolver.uri(), 5_000).await;
    let response = Client::new()
        .post(format!("{gateway}/cep"))
        .body(r#"{"cep":"50010000"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-resolver"], "yes");
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.text().await.unwrap(), r#"{"city":"Recife"}"#);
}

#[tokio::test]
async fn test_rejected_requests_never_reach_resolver() {
    let resolver = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&resolver)
        .await;
    let gateway = common::spawn_gateway(&resolver.uri(), 5_000).await;

    let response = Client::new()
        .get(format!("{gateway}/cep"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.text().await.unwrap(), "method not allowed");

    for body in [
        r#"{"cep":"0131010"}"#,
        r#"{"cep":"01310-100"}"#,
        r#"{"cep":"01310100","extra":true}"#,
        r#""01310100""#,
    ] {
        let (status, text) = post_cep(&gateway, body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {body}");
        assert_eq!(text, "invalid zipcode");
    }
}

#[tokio::test]
async fn test_verb_is_checked_before_body_size() {
    let resolver = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&resolver)
        .await;
    let gateway = common::spawn_gateway(&resolver.uri(), 5_000).await;

    // 70 KiB against the default 64 KiB cap
    let body = format!(r#"{{"cep":"01310100","pad":"{}"}}"#, "x".repeat(70 * 1024));
    let response = Client::new()
        .get(format!("{gateway}/cep"))
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.text().await.unwrap(), "method not allowed");

    let (status, text) = post_cep(&gateway, &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(text, "invalid zipcode");
}

#[tokio::test]
async fn test_trace_continues_across_services() {
    common::install_tracing();

    let (location, weather) = sao_paulo_providers().await;
    let resolver = common::spawn_resolver(&location, &weather, Some(WEATHER_API_KEY), 5_000).await;
    let gateway = common::spawn_gateway(&resolver, 5_000).await;

    let response = Client::new()
        .post(format!("{gateway}/cep"))
        .header("traceparent", TRACEPARENT)
        .body(r#"{"cep":"01310100"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let provider_calls = [
        location.received_requests().await.unwrap(),
        weather.received_requests().await.unwrap(),
    ];
    for request in provider_calls.iter().flatten() {
        let traceparent = request.headers["traceparent"].to_str().unwrap();
        let parts: Vec<&str> = traceparent.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1], TRACE_ID);
        assert_ne!(parts[2], "00f067aa0ba902b7");
    }
    assert_eq!(provider_calls.iter().flatten().count(), 2);
}

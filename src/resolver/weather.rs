//! Current temperature lookup against a WeatherAPI-style service

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, field::Empty, instrument};

use super::upstream_failure;
use crate::error::ServiceError;
use crate::models::WeatherSample;

/// Reports the current temperature of a locality
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_temperature(&self, locality: &str) -> Result<WeatherSample, ServiceError>;
}

/// WeatherAPI client (`GET {base}/v1/current.json?key=..&q=..&aqi=no`)
pub struct WeatherApiClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentData,
}

#[derive(Debug, Deserialize)]
struct CurrentData {
    temp_c: f64,
}

impl WeatherApiClient {
    /// Create a new client. Without an API key every lookup fails with
    /// [`ServiceError::MisconfiguredDependency`] before touching the network.
    pub fn new(client: ClientWithMiddleware, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(
        name = "weather lookup",
        skip(self, api_key),
        fields(
            otel.kind = "client",
            otel.status_code = Empty,
            otel.status_message = Empty,
        )
    )]
    async fn fetch(&self, locality: &str, api_key: &str) -> Result<WeatherSample, ServiceError> {
        let url = format!(
            "{}/v1/current.json?key={}&q={}&aqi=no",
            self.base_url,
            urlencoding::encode(api_key),
            urlencoding::encode(locality)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| upstream_failure(format!("weather request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            return Err(upstream_failure(format!(
                "weather status {status}: {error_text}"
            )));
        }

        let body: CurrentResponse = response
            .json()
            .await
            .map_err(|e| upstream_failure(format!("weather response malformed: {e}")))?;

        debug!(temp_c = body.current.temp_c, "Weather lookup finished");
        Ok(WeatherSample {
            celsius: body.current.temp_c,
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn current_temperature(&self, locality: &str) -> Result<WeatherSample, ServiceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ServiceError::MisconfiguredDependency);
        };
        self.fetch(locality, api_key).await
    }
}

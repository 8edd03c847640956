//! Postal code to locality lookup against a ViaCEP-style API

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, field::Empty, instrument};

use super::upstream_failure;
use crate::error::ServiceError;
use crate::models::{LocationResult, PostalCode};

/// Resolves a postal code to the name of its locality
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// `Ok(LocationResult::NotFound)` when the provider does not know the
    /// code, `Err` when the provider could not be asked.
    async fn lookup(&self, postal_code: &PostalCode) -> Result<LocationResult, ServiceError>;
}

/// ViaCEP API client (`GET {base}/ws/{cep}/json/`)
pub struct ViaCepClient {
    client: ClientWithMiddleware,
    base_url: String,
}

/// Lookup response. `erro` is a string in older API versions and a boolean
/// in newer ones.
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepResponse {
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn into_location(self) -> LocationResult {
        if self.is_error() {
            LocationResult::NotFound
        } else {
            LocationResult::from_locality(self.localidade)
        }
    }
}

impl ViaCepClient {
    /// Create a new client
    pub fn new(client: ClientWithMiddleware, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LocationProvider for ViaCepClient {
    #[instrument(
        name = "location lookup",
        skip(self),
        fields(
            cep = %postal_code,
            otel.kind = "client",
            otel.status_code = Empty,
            otel.status_message = Empty,
        )
    )]
    async fn lookup(&self, postal_code: &PostalCode) -> Result<LocationResult, ServiceError> {
        let url = format!("{}/ws/{}/json/", self.base_url, postal_code);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| upstream_failure(format!("location request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(upstream_failure(format!("location status {status}")));
        }

        let body: ViaCepResponse = response
            .json()
            .await
            .map_err(|e| upstream_failure(format!("location response malformed: {e}")))?;

        let location = body.into_location();
        debug!(?location, "Location lookup finished");
        Ok(location)
    }
}

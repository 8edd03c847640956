//! Resolver service: `GET /weather?cep=NNNNNNNN`
//!
//! Validates the postal code, looks up its locality, asks the weather
//! provider for the current temperature and answers with a
//! [`TemperatureReading`] in three scales.

pub mod location;
pub mod pipeline;
pub mod weather;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};
use tracing::{debug, info, warn};

use crate::{
    config::ResolverConfig,
    error::ServiceError,
    models::{PostalCode, TemperatureReading},
    telemetry::{self, ServerSpanLayer, build_http_client},
};

pub use location::{LocationProvider, ViaCepClient};
pub use pipeline::WeatherPipeline;
pub use weather::{WeatherApiClient, WeatherProvider};

const USER_AGENT: &str = concat!("cep-weather-resolver/", env!("CARGO_PKG_VERSION"));

/// Shared handler state
#[derive(Clone)]
pub struct ResolverState {
    pipeline: Arc<WeatherPipeline>,
}

impl ResolverState {
    pub fn new(pipeline: WeatherPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Wire the HTTP-backed providers from configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let client = build_http_client(USER_AGENT)?;

        let location = ViaCepClient::new(client.clone(), &config.location_api_url);
        let weather = WeatherApiClient::new(
            client,
            &config.weather_api_url,
            config.weather_api_key.clone(),
        );
        if !weather.has_api_key() {
            warn!("WEATHER_API_KEY is not set, weather lookups will answer 500");
        }

        Ok(Self::new(WeatherPipeline::new(
            Arc::new(location),
            Arc::new(weather),
            config.timeout(),
        )))
    }
}

pub fn router(state: ResolverState) -> Router {
    Router::new()
        .route("/weather", get(handle_weather))
        .route_layer(ServerSpanLayer::new("handle_weather"))
        .with_state(state)
}

/// First `cep` value of the query string, empty when absent
fn first_cep(pairs: &[(String, String)]) -> &str {
    pairs
        .iter()
        .find(|(name, _)| name == "cep")
        .map_or("", |(_, value)| value.as_str())
}

async fn handle_weather(
    State(state): State<ResolverState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<TemperatureReading>, ServiceError> {
    let Query(pairs) = query.map_err(|e| {
        debug!(error = %e, "Rejected query string");
        ServiceError::InvalidFormat
    })?;
    let postal_code = PostalCode::parse(first_cep(&pairs))?;
    let reading = state.pipeline.resolve(&postal_code).await?;

    info!(cep = %postal_code, city = %reading.city, temp_c = reading.temp_c, "Weather resolved");
    Ok(Json(reading))
}

/// Mark the current client span as failed and build the error for it
pub(crate) fn upstream_failure(reason: String) -> ServiceError {
    telemetry::record_failure(&reason);
    ServiceError::upstream(reason)
}

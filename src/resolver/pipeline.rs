//! The resolver's lookup pipeline: location, then weather, then conversion.

use std::{sync::Arc, time::Duration};

use tracing::info;

use super::{location::LocationProvider, weather::WeatherProvider};
use crate::Result;
use crate::error::ServiceError;
use crate::models::{LocationResult, PostalCode, TemperatureReading};

/// Runs the two provider lookups for a validated postal code under one
/// deadline. Steps run strictly in order and none is retried.
pub struct WeatherPipeline {
    location: Arc<dyn LocationProvider>,
    weather: Arc<dyn WeatherProvider>,
    deadline: Duration,
}

impl WeatherPipeline {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        weather: Arc<dyn WeatherProvider>,
        deadline: Duration,
    ) -> Self {
        Self {
            location,
            weather,
            deadline,
        }
    }

    /// Resolve `postal_code` to a temperature reading.
    ///
    /// When the deadline elapses the in-flight call is dropped and the
    /// result is [`ServiceError::UpstreamFailure`].
    pub async fn resolve(&self, postal_code: &PostalCode) -> Result<TemperatureReading> {
        tokio::time::timeout(self.deadline, self.run(postal_code)).await?
    }

    async fn run(&self, postal_code: &PostalCode) -> Result<TemperatureReading> {
        let city = match self.location.lookup(postal_code).await? {
            LocationResult::Found(city) => city,
            LocationResult::NotFound => {
                info!(cep = %postal_code, "Postal code has no locality");
                return Err(ServiceError::NotFound);
            }
        };

        let sample = self.weather.current_temperature(&city).await?;
        Ok(TemperatureReading::from_sample(city, sample))
    }
}

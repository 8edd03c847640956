//! Weather sample and the temperature reading returned to callers

use serde::{Deserialize, Serialize};

/// Offset between Celsius and the Kelvin value reported to callers
pub const KELVIN_OFFSET: f64 = 273.0;

/// Current temperature for one locality as reported by the weather provider
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    /// Temperature in Celsius
    pub celsius: f64,
}

/// Temperature of a city in three scales, all derived from one sample
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TemperatureReading {
    pub city: String,
    #[serde(rename = "temp_C")]
    pub temp_c: f64,
    #[serde(rename = "temp_F")]
    pub temp_f: f64,
    #[serde(rename = "temp_K")]
    pub temp_k: f64,
}

impl TemperatureReading {
    /// Convert a Celsius sample into the three reported scales
    #[must_use]
    pub fn from_sample(city: impl Into<String>, sample: WeatherSample) -> Self {
        let celsius = sample.celsius;
        Self {
            city: city.into(),
            temp_c: round1(celsius),
            temp_f: round1(celsius_to_fahrenheit(celsius)),
            temp_k: round1(celsius_to_kelvin(celsius)),
        }
    }
}

#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

#[must_use]
pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + KELVIN_OFFSET
}

/// Round to one decimal place, ties towards positive infinity
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

//! Data models for the cep-weather services
//!
//! This module contains the request-scoped domain models:
//! - PostalCode: Validated eight-digit CEP
//! - Location: Outcome of the postal code lookup
//! - Weather: Provider sample and the converted temperature reading

pub mod location;
pub mod postal_code;
pub mod weather;

// Re-export all public types for convenient access
pub use location::LocationResult;
pub use postal_code::{PostalCode, is_valid_postal_code};
pub use weather::{TemperatureReading, WeatherSample, round1};

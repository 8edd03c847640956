//! `cep-weather` - Current temperature for a Brazilian postal code
//!
//! Two small HTTP services share this library: the gateway validates
//! `POST /cep` requests and forwards them, the resolver turns a postal code
//! into a locality and the locality into a temperature. Both join the same
//! distributed trace.

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod resolver;
pub mod server;
pub mod telemetry;

// Re-export core types for public API
pub use config::{Role, ServiceConfig};
pub use error::ServiceError;
pub use gateway::{GatewayState, ResolverForwarder};
pub use models::{LocationResult, PostalCode, TemperatureReading, WeatherSample};
pub use resolver::{
    LocationProvider, ResolverState, ViaCepClient, WeatherApiClient, WeatherPipeline,
    WeatherProvider,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ServiceError>;

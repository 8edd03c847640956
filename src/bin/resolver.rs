use anyhow::Result;
use cep_weather::{
    config::{Role, ServiceConfig},
    resolver::{self, ResolverState},
    server, telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load(Role::Resolver)?;
    let _telemetry = telemetry::init(&config.telemetry)?;

    tracing::info!(
        version = cep_weather::VERSION,
        location_api = %config.resolver.location_api_url,
        weather_api = %config.resolver.weather_api_url,
        "Starting resolver"
    );

    let state = ResolverState::from_config(&config.resolver)?;
    let listener = server::bind(config.server.port).await?;
    server::serve(listener, resolver::router(state)).await
}

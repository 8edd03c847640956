use anyhow::Result;
use cep_weather::{
    config::{Role, ServiceConfig},
    gateway::{self, GatewayState},
    server, telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load(Role::Gateway)?;
    let _telemetry = telemetry::init(&config.telemetry)?;

    tracing::info!(
        version = cep_weather::VERSION,
        resolver = %config.gateway.resolver_url,
        "Starting gateway"
    );

    let state = GatewayState::from_config(&config.gateway)?;
    let listener = server::bind(config.server.port).await?;
    server::serve(listener, gateway::router(state)).await
}

//! Configuration management for the gateway and resolver services
//!
//! Settings are layered: role defaults, an optional TOML file, `CEPWEATHER_*`
//! environment variables and finally the well-known variables operators
//! already use (`PORT`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `WEATHER_API_KEY`, ...).
//! Everything is read once at startup and never mutated afterwards.

use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Env var naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "CEPWEATHER_CONFIG";

/// Env vars naming the resolver base URL, in order of precedence
pub const RESOLVER_URL_ENVS: [&str; 2] = ["RESOLVER_URL", "SERVICE_B_URL"];

/// Which of the two services is being configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Gateway,
    Resolver,
}

impl Role {
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Role::Gateway => 8081,
            Role::Resolver => 8080,
        }
    }

    #[must_use]
    pub fn service_name(self) -> &'static str {
        match self {
            Role::Gateway => "gateway",
            Role::Resolver => "resolver",
        }
    }
}

/// Root configuration shared by both binaries
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Tracing, logging and export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Export spans and logs over OTLP
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// OTLP/HTTP collector base URL
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    /// Value of the `service.name` resource attribute
    #[serde(default)]
    pub service_name: String,
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Gateway forwarding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the resolver service
    #[serde(default = "default_resolver_url")]
    pub resolver_url: String,
    /// Deadline for the forwarded call in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Resolver pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Base URL of the postal code lookup API
    #[serde(default = "default_location_api_url")]
    pub location_api_url: String,
    /// Base URL of the current weather API
    #[serde(default = "default_weather_api_url")]
    pub weather_api_url: String,
    /// Weather API key; requests fail with 500 when missing
    #[serde(default)]
    pub weather_api_key: Option<String>,
    /// Deadline for the whole lookup pipeline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

// Default value functions
fn default_port() -> u16 {
    Role::Gateway.default_port()
}

fn default_true() -> bool {
    true
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4318".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_resolver_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_location_api_url() -> String {
    "https://viacep.com.br".to_string()
}

fn default_weather_api_url() -> String {
    "https://api.weatherapi.com".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            otlp_endpoint: default_otlp_endpoint(),
            service_name: String::new(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            resolver_url: default_resolver_url(),
            timeout_ms: default_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            location_api_url: default_location_api_url(),
            weather_api_url: default_weather_api_url(),
            weather_api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ServiceConfig {
    /// Load configuration for `role` from the environment and the optional
    /// file named by `CEPWEATHER_CONFIG`
    pub fn load(role: Role) -> Result<Self> {
        let path = non_empty_var(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from_path(role, path)
    }

    /// Load configuration from the specified path plus the environment
    pub fn load_from_path(role: Role, config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Self::role_defaults(role)?;

        if let Some(config_file) = config_path {
            builder = builder.add_source(
                File::from(config_file)
                    .required(true)
                    .format(FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("CEPWEATHER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder = builder
            .set_override_option("server.port", non_empty_var("PORT"))?
            .set_override_option(
                "telemetry.otlp_endpoint",
                non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            )?
            .set_override_option("telemetry.service_name", non_empty_var("OTEL_SERVICE_NAME"))?
            .set_override_option(
                "gateway.resolver_url",
                first_non_empty(&RESOLVER_URL_ENVS, |name| env::var(name).ok()),
            )?
            .set_override_option("resolver.location_api_url", non_empty_var("LOCATION_API_URL"))?
            .set_override_option("resolver.weather_api_url", non_empty_var("WEATHER_API_URL"))?
            .set_override_option("resolver.weather_api_key", non_empty_var("WEATHER_API_KEY"))?;

        Self::finish(builder, role)
    }

    /// Load configuration from a TOML document, ignoring the environment
    pub fn from_toml_str(role: Role, toml: &str) -> Result<Self> {
        let builder = Self::role_defaults(role)?.add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder, role)
    }

    fn role_defaults(role: Role) -> Result<ConfigBuilder<DefaultState>> {
        Config::builder()
            .set_default("server.port", i64::from(role.default_port()))?
            .set_default("telemetry.service_name", role.service_name())
            .context("Failed to set role defaults")
    }

    fn finish(builder: ConfigBuilder<DefaultState>, role: Role) -> Result<Self> {
        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: ServiceConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults(role);
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self, role: Role) {
        if self.server.port == 0 {
            self.server.port = role.default_port();
        }
        if self.telemetry.service_name.trim().is_empty() {
            self.telemetry.service_name = role.service_name().to_string();
        }
        if self.telemetry.log_level.is_empty() {
            self.telemetry.log_level = default_log_level();
        }
        if self
            .resolver
            .weather_api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            self.resolver.weather_api_key = None;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_urls()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_urls(&self) -> Result<()> {
        let urls = [
            ("telemetry.otlp_endpoint", &self.telemetry.otlp_endpoint),
            ("gateway.resolver_url", &self.gateway.resolver_url),
            ("resolver.location_api_url", &self.resolver.location_api_url),
            ("resolver.weather_api_url", &self.resolver.weather_api_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("{name} must be a valid HTTP or HTTPS URL, got '{url}'");
            }
        }
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        for (name, timeout_ms) in [
            ("gateway.timeout_ms", self.gateway.timeout_ms),
            ("resolver.timeout_ms", self.resolver.timeout_ms),
        ] {
            if timeout_ms == 0 || timeout_ms > 300_000 {
                bail!("{name} must be between 1 and 300000 milliseconds");
            }
        }

        if self.gateway.max_body_bytes == 0 {
            bail!("gateway.max_body_bytes must be greater than zero");
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        // Same parser `telemetry::init` feeds, so directives like
        // `info,hyper=warn` are accepted too
        EnvFilter::try_new(&self.telemetry.log_level).with_context(|| {
            format!("Invalid log level '{}'", self.telemetry.log_level)
        })?;
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    first_non_empty(&[name], |name| env::var(name).ok())
}

/// Value of the first of `names` that `lookup` finds set and non-blank
fn first_non_empty(names: &[&str], lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    names
        .iter()
        .find_map(|name| lookup(*name).filter(|value| !value.trim().is_empty()))
}

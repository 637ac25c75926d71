use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use relay::RawListenerSettings;

/// Process settings, read once from the environment at startup.
///
/// Variable names are unprefixed and matched case-insensitively
/// (`PARTITIONKEY` → `partitionkey`). Empty values are kept as empty strings
/// and interpreted by [`relay::ListenerConfig::from_raw`].
#[derive(Deserialize, Clone)]
pub struct ServiceConfig {
    /// `SOURCE`: label embedded in telemetry event names
    #[serde(default)]
    pub source: String,

    /// `PARTITIONKEY`: partition to bind to
    #[serde(default)]
    pub partitionkey: String,

    /// `EVENTHUBCONNSTRING`: transport connection string
    #[serde(default)]
    pub eventhubconnstring: String,

    /// `EVENTHUBPATH`: event hub name; may be empty when the connection string has EntityPath
    #[serde(default)]
    pub eventhubpath: String,

    /// `PROCESSENDPOINT`: URL orders are POSTed to
    #[serde(default)]
    pub processendpoint: String,

    /// `INSIGHTSKEY`: telemetry key; empty disables telemetry
    #[serde(default)]
    pub insightskey: String,

    /// `FORWARDTIMEOUTSECS`: per-request forward timeout
    #[serde(default)]
    pub forwardtimeoutsecs: Option<u64>,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // OpenTelemetry configuration
    /// Export tracing spans over OTLP
    #[serde(default)]
    pub otel_enabled: bool,

    /// OpenTelemetry OTLP endpoint (gRPC)
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    /// Service name for OpenTelemetry resource
    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "eventlistener".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    /// The listener-relevant subset, still unvalidated.
    pub fn listener_settings(&self) -> RawListenerSettings {
        RawListenerSettings {
            source: self.source.clone(),
            partition_key: self.partitionkey.clone(),
            connection_string: self.eventhubconnstring.clone(),
            hub_path: self.eventhubpath.clone(),
            process_endpoint: self.processendpoint.clone(),
            insights_key: self.insightskey.clone(),
            forward_timeout_secs: self.forwardtimeoutsecs,
        }
    }
}

//! Immutable listener configuration.
//!
//! [`ListenerConfig`] is built once by the composition root from whatever
//! configuration source it uses, validated, and then shared read-only with the
//! connector, forwarder, and telemetry reporter. Nothing in this workspace
//! reads the environment after startup.

use std::time::Duration;

use crate::errors::ConfigError;
use crate::identifiers::{ConsumerGroup, HubName, PartitionKey, SourceLabel};

/// Default timeout applied to each forward request.
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Unvalidated settings, one field per environment variable.
///
/// Empty strings are treated as absent, matching how the daemon has always
/// been deployed (variables declared but left blank).
#[derive(Debug, Clone, Default)]
pub struct RawListenerSettings {
    /// `SOURCE`
    pub source: String,
    /// `PARTITIONKEY`
    pub partition_key: String,
    /// `EVENTHUBCONNSTRING`
    pub connection_string: String,
    /// `EVENTHUBPATH`
    pub hub_path: String,
    /// `PROCESSENDPOINT`
    pub process_endpoint: String,
    /// `INSIGHTSKEY`
    pub insights_key: String,
    /// `FORWARDTIMEOUTSECS`
    pub forward_timeout_secs: Option<u64>,
}

/// Validated configuration for one listener process.
#[derive(Clone)]
pub struct ListenerConfig {
    source: SourceLabel,
    partition: PartitionKey,
    consumer_group: ConsumerGroup,
    connection_string: String,
    hub_path: Option<HubName>,
    process_endpoint: String,
    insights_key: Option<String>,
    forward_timeout: Duration,
}

impl ListenerConfig {
    /// Validates raw settings.
    ///
    /// `PARTITIONKEY`, `EVENTHUBCONNSTRING` and `PROCESSENDPOINT` are required.
    /// `EVENTHUBPATH` and `INSIGHTSKEY` may be empty. `SOURCE` only appears in
    /// telemetry event names, so it is required only when `INSIGHTSKEY` is set.
    pub fn from_raw(raw: RawListenerSettings) -> Result<Self, ConfigError> {
        let insights_key = Some(raw.insights_key.trim().to_string()).filter(|k| !k.is_empty());
        let source = match (SourceLabel::new(raw.source), &insights_key) {
            (Some(source), _) => source,
            (None, None) => SourceLabel::unlabelled(),
            (None, Some(_)) => return Err(ConfigError::Missing { name: "SOURCE" }),
        };
        let partition = PartitionKey::new(raw.partition_key)
            .ok_or(ConfigError::Missing { name: "PARTITIONKEY" })?;

        let connection_string = raw.connection_string.trim().to_string();
        if connection_string.is_empty() {
            return Err(ConfigError::Missing {
                name: "EVENTHUBCONNSTRING",
            });
        }

        let process_endpoint = raw.process_endpoint.trim().to_string();
        if process_endpoint.is_empty() {
            return Err(ConfigError::Missing {
                name: "PROCESSENDPOINT",
            });
        }
        if !(process_endpoint.starts_with("http://") || process_endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "PROCESSENDPOINT",
                message: format!("'{process_endpoint}' is not an http(s) URL"),
            });
        }

        let forward_timeout = match raw.forward_timeout_secs {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    name: "FORWARDTIMEOUTSECS",
                    message: "must be greater than zero".to_string(),
                })
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_FORWARD_TIMEOUT,
        };

        Ok(Self {
            source,
            partition,
            consumer_group: ConsumerGroup::default_group(),
            connection_string,
            hub_path: HubName::new(raw.hub_path.trim()),
            process_endpoint,
            insights_key,
            forward_timeout,
        })
    }

    /// Label embedded in telemetry event names.
    pub fn source(&self) -> &SourceLabel {
        &self.source
    }

    /// Partition the receiver binds to.
    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    /// Consumer group the receiver reads as (always `$Default`).
    pub fn consumer_group(&self) -> &ConsumerGroup {
        &self.consumer_group
    }

    /// Transport connection string.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Explicit stream path, if one was configured.
    pub fn hub_path(&self) -> Option<&HubName> {
        self.hub_path.as_ref()
    }

    /// URL the forwarder POSTs to.
    pub fn process_endpoint(&self) -> &str {
        &self.process_endpoint
    }

    /// Telemetry key; `None` disables telemetry entirely.
    pub fn insights_key(&self) -> Option<&str> {
        self.insights_key.as_deref()
    }

    /// Whether a telemetry reporter should be constructed.
    pub fn telemetry_enabled(&self) -> bool {
        self.insights_key.is_some()
    }

    /// Timeout applied to each forward request.
    pub fn forward_timeout(&self) -> Duration {
        self.forward_timeout
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("source", &self.source)
            .field("partition", &self.partition)
            .field("consumer_group", &self.consumer_group)
            .field("connection_string", &"<redacted>")
            .field("hub_path", &self.hub_path)
            .field("process_endpoint", &self.process_endpoint)
            .field("telemetry_enabled", &self.telemetry_enabled())
            .field("forward_timeout", &self.forward_timeout)
            .finish()
    }
}

//! Event Hubs connection-string parsing.
//!
//! Accepts the `Key=Value;Key=Value` format issued by the Azure portal for an
//! Event Hubs namespace or a single event hub:
//!
//! ```text
//! Endpoint=sb://<namespace>.servicebus.windows.net/;SharedAccessKeyName=<rule>;SharedAccessKey=<key>[;EntityPath=<hub>]
//! ```
//!
//! Keys are matched case-insensitively. Unknown keys are ignored.
//!
//! IoT Hub sources are rejected here rather than at connect time. The receiver
//! only speaks the Kafka protocol, and neither an IoT Hub `HostName=` string nor
//! its built-in Event Hub-compatible endpoint (`iothub-ns-*`) has a Kafka
//! listener. Device messages can still be consumed by routing them to a
//! Standard-tier (or higher) event hub and using that hub's connection string.

use relay::{ConnectorError, HubName};

const ENDPOINT_SCHEME: &str = "sb://";

/// Host prefix of the namespace behind an IoT Hub's built-in endpoint.
const IOT_HUB_BUILT_IN_PREFIX: &str = "iothub-ns-";

const IOT_HUB_UNSUPPORTED: &str = "IoT Hub sources are not supported: the receiver uses the Event Hubs Kafka endpoint, which IoT Hub does not expose; route device messages to a Standard-tier event hub and use its connection string";

/// A parsed Event Hubs connection string.
#[derive(Clone)]
pub struct ConnectionString {
    raw: String,
    host: String,
    key_name: Option<String>,
    key: Option<String>,
    entity_path: Option<HubName>,
}

impl ConnectionString {
    /// Parses a connection string.
    pub fn parse(raw: &str) -> Result<Self, ConnectorError> {
        let raw = raw.trim();
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;
        let mut entity_path = None;
        let mut host_name = false;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = segment.split_once('=').ok_or_else(|| {
                ConnectorError::InvalidConnectionString(format!(
                    "segment '{}' is not of the form Key=Value",
                    segment_name(segment)
                ))
            })?;
            let value = value.trim().to_string();
            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value),
                "sharedaccesskeyname" => key_name = Some(value),
                "sharedaccesskey" => key = Some(value),
                "entitypath" => entity_path = HubName::new(value),
                "hostname" => host_name = true,
                _ => {}
            }
        }

        let Some(endpoint) = endpoint else {
            let message = if host_name {
                IOT_HUB_UNSUPPORTED
            } else {
                "missing Endpoint"
            };
            return Err(ConnectorError::InvalidConnectionString(message.to_string()));
        };

        let host = endpoint
            .strip_prefix(ENDPOINT_SCHEME)
            .ok_or_else(|| {
                ConnectorError::InvalidConnectionString(format!(
                    "Endpoint must start with {ENDPOINT_SCHEME}"
                ))
            })?
            .trim_end_matches('/')
            .to_string();
        if host.is_empty() || host.contains('/') {
            return Err(ConnectorError::InvalidConnectionString(
                "Endpoint has no host".to_string(),
            ));
        }
        if host.to_ascii_lowercase().starts_with(IOT_HUB_BUILT_IN_PREFIX) {
            return Err(ConnectorError::InvalidConnectionString(
                IOT_HUB_UNSUPPORTED.to_string(),
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            host,
            key_name,
            key,
            entity_path,
        })
    }

    /// Namespace host, e.g. `orders.servicebus.windows.net`.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Name of the shared access policy, if present.
    pub fn key_name(&self) -> Option<&str> {
        self.key_name.as_deref()
    }

    /// Whether a shared access key is present.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Event hub named by the connection string, if it is hub-scoped.
    pub fn entity_path(&self) -> Option<&HubName> {
        self.entity_path.as_ref()
    }

    /// The connection string exactly as supplied (secrets included).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Picks the hub to consume: an explicit stream path wins, otherwise the
    /// connection string's `EntityPath`.
    pub fn resolve_hub(&self, explicit: Option<&HubName>) -> Result<HubName, ConnectorError> {
        explicit
            .or(self.entity_path.as_ref())
            .cloned()
            .ok_or(ConnectorError::MissingHubName)
    }
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host", &self.host)
            .field("key_name", &self.key_name)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("entity_path", &self.entity_path)
            .finish()
    }
}

// Only the key part of a malformed segment is echoed; the value may be a secret.
fn segment_name(segment: &str) -> &str {
    segment.split('=').next().unwrap_or_default()
}

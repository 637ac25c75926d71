//! Event Hubs partition receiver over the Kafka-compatible endpoint.
//!
//! Every Event Hubs namespace of Standard tier and above exposes a Kafka
//! endpoint on port 9093. Basic-tier namespaces and IoT Hub built-in endpoints
//! do not, so they cannot be consumed by this receiver. The receiver authenticates with SASL PLAIN using the
//! literal username `$ConnectionString` and the connection string as password,
//! then assigns itself exactly one partition of the hub. There is no group
//! membership, no rebalancing, and no offset commit: the start offset is
//! resolved from the look-back instant on every start.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use tracing::{debug, info};

use relay::{
    ConnectorError, ConsumerGroup, HubName, ListenerConfig, MessageMetadata, PartitionKey,
    PartitionReceiver, ReceiverError, ReceiverEvent, StartPosition, StreamConnector,
    StreamMessage, Timestamp,
};

use crate::connection_string::ConnectionString;

/// Port of the Event Hubs Kafka endpoint.
pub const KAFKA_PORT: u16 = 9093;

/// SASL username Event Hubs expects when the password is a connection string.
const SASL_USERNAME: &str = "$ConnectionString";

/// Upper bound on each broker round-trip made while opening the receiver.
const OPEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens [`EventHubReceiver`]s on one partition of one event hub.
#[derive(Debug, Clone)]
pub struct EventHubConnector {
    connection: ConnectionString,
    hub: HubName,
    partition_key: PartitionKey,
    partition: i32,
    consumer_group: ConsumerGroup,
}

impl EventHubConnector {
    /// Builds a connector from validated listener configuration.
    ///
    /// Fails if the connection string is malformed, no hub name can be
    /// determined, or the partition key is not a partition number.
    pub fn from_config(config: &ListenerConfig) -> Result<Self, ConnectorError> {
        let connection = ConnectionString::parse(config.connection_string())?;
        let hub = connection.resolve_hub(config.hub_path())?;
        let partition = parse_partition(config.partition())?;

        Ok(Self {
            connection,
            hub,
            partition_key: config.partition().clone(),
            partition,
            consumer_group: config.consumer_group().clone(),
        })
    }

    /// The event hub this connector reads.
    pub fn hub(&self) -> &HubName {
        &self.hub
    }

    /// The numeric partition this connector binds to.
    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// librdkafka settings for the Event Hubs Kafka endpoint.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set(
                "bootstrap.servers",
                format!("{}:{KAFKA_PORT}", self.connection.host()),
            )
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanism", "PLAIN")
            .set("sasl.username", SASL_USERNAME)
            .set("sasl.password", self.connection.as_str())
            .set("group.id", self.consumer_group.as_str())
            .set("client.id", format!("eventlistener-{}", self.partition))
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false")
            .set("request.timeout.ms", "60000");
        config
    }
}

#[async_trait]
impl StreamConnector for EventHubConnector {
    async fn open(
        &self,
        start: StartPosition,
    ) -> Result<Box<dyn PartitionReceiver>, ConnectorError> {
        info!(
            host = %self.connection.host(),
            hub = %self.hub,
            partition = self.partition,
            consumer_group = %self.consumer_group,
            start = %start,
            "Opening event hub receiver"
        );

        let client_config = self.client_config();
        let hub = self.hub.clone();
        let partition = self.partition;
        let partition_key = self.partition_key.clone();

        // Metadata and offset lookups are blocking librdkafka calls.
        let consumer = tokio::task::spawn_blocking(move || {
            open_consumer(&client_config, &hub, partition, &partition_key, start)
        })
        .await
        .map_err(|e| ConnectorError::Connect(format!("receiver setup task failed: {e}")))??;

        info!(hub = %self.hub, partition = self.partition, "Receiver created");
        Ok(Box::new(EventHubReceiver { consumer }))
    }
}

fn open_consumer(
    client_config: &ClientConfig,
    hub: &HubName,
    partition: i32,
    partition_key: &PartitionKey,
    start: StartPosition,
) -> Result<StreamConsumer, ConnectorError> {
    let consumer: StreamConsumer = client_config
        .create()
        .map_err(|e| ConnectorError::Connect(e.to_string()))?;

    let metadata = consumer
        .fetch_metadata(Some(hub.as_str()), OPEN_TIMEOUT)
        .map_err(|e| ConnectorError::Connect(e.to_string()))?;
    let topic = metadata
        .topics()
        .iter()
        .find(|t| t.name() == hub.as_str())
        .ok_or_else(|| ConnectorError::CreateReceiver {
            partition: partition_key.to_string(),
            message: format!("event hub '{hub}' not found"),
        })?;
    if let Some(err) = topic.error() {
        return Err(ConnectorError::CreateReceiver {
            partition: partition_key.to_string(),
            message: format!("event hub '{hub}' unavailable: {err:?}"),
        });
    }
    if !topic.partitions().iter().any(|p| p.id() == partition) {
        return Err(ConnectorError::InvalidPartition {
            partition: partition_key.to_string(),
            message: format!(
                "event hub '{hub}' has {} partitions",
                topic.partitions().len()
            ),
        });
    }

    let create_err = |e: rdkafka::error::KafkaError| ConnectorError::CreateReceiver {
        partition: partition_key.to_string(),
        message: e.to_string(),
    };

    // Offsets-for-times takes the timestamp in the offset slot and answers with
    // the first offset whose timestamp is at or after it.
    let mut wanted = TopicPartitionList::new();
    wanted
        .add_partition_offset(
            hub.as_str(),
            partition,
            Offset::Offset(start.instant().unix_millis()),
        )
        .map_err(create_err)?;
    let resolved = consumer
        .offsets_for_times(wanted, OPEN_TIMEOUT)
        .map_err(create_err)?;
    debug!(assignment = ?resolved, "Resolved start offset");

    consumer.assign(&resolved).map_err(create_err)?;
    Ok(consumer)
}

fn parse_partition(key: &PartitionKey) -> Result<i32, ConnectorError> {
    key.as_str()
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|p| *p >= 0)
        .ok_or_else(|| ConnectorError::InvalidPartition {
            partition: key.to_string(),
            message: "partition key must be a non-negative partition number".to_string(),
        })
}

/// A live receiver on one event hub partition.
pub struct EventHubReceiver {
    consumer: StreamConsumer,
}

#[async_trait]
impl PartitionReceiver for EventHubReceiver {
    async fn next_event(&mut self) -> Option<ReceiverEvent> {
        let event = match self.consumer.recv().await {
            Ok(message) => ReceiverEvent::Message(to_stream_message(&message)),
            Err(e) => ReceiverEvent::Error(ReceiverError::new(e.to_string())),
        };
        Some(event)
    }
}

fn to_stream_message(message: &BorrowedMessage<'_>) -> StreamMessage {
    let metadata = MessageMetadata {
        partition: Some(message.partition()),
        offset: Some(message.offset()),
        enqueued_at: message
            .timestamp()
            .to_millis()
            .and_then(Timestamp::from_unix_millis),
    };
    StreamMessage::from_payload(message.payload().unwrap_or_default(), metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay::RawListenerSettings;

    fn config(connection_string: &str, hub_path: &str, partition: &str) -> ListenerConfig {
        ListenerConfig::from_raw(RawListenerSettings {
            source: "orders-eu".to_string(),
            partition_key: partition.to_string(),
            connection_string: connection_string.to_string(),
            hub_path: hub_path.to_string(),
            process_endpoint: "http://localhost:8080/process".to_string(),
            insights_key: String::new(),
            forward_timeout_secs: None,
        })
        .unwrap()
    }

    const NAMESPACE: &str =
        "Endpoint=sb://orders.servicebus.windows.net/;SharedAccessKeyName=listen;SharedAccessKey=k=";

    #[test]
    fn test_connector_from_config() {
        let connector = EventHubConnector::from_config(&config(NAMESPACE, "orders", "3")).unwrap();
        assert_eq!(connector.hub().as_str(), "orders");
        assert_eq!(connector.partition(), 3);
    }

    #[test]
    fn test_hub_from_entity_path_when_path_empty() {
        let cs = format!("{NAMESPACE};EntityPath=incoming");
        let connector = EventHubConnector::from_config(&config(&cs, "", "0")).unwrap();
        assert_eq!(connector.hub().as_str(), "incoming");
    }

    #[test]
    fn test_missing_hub_is_fatal() {
        let err = EventHubConnector::from_config(&config(NAMESPACE, "", "0")).unwrap_err();
        assert!(matches!(err, ConnectorError::MissingHubName));
    }

    #[test]
    fn test_non_numeric_partition_rejected() {
        let err = EventHubConnector::from_config(&config(NAMESPACE, "orders", "east")).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidPartition { .. }));

        let err = EventHubConnector::from_config(&config(NAMESPACE, "orders", "-1")).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidPartition { .. }));
    }

    #[test]
    fn test_client_config_targets_kafka_endpoint() {
        let connector = EventHubConnector::from_config(&config(NAMESPACE, "orders", "0")).unwrap();
        let client = connector.client_config();
        assert_eq!(
            client.get("bootstrap.servers"),
            Some("orders.servicebus.windows.net:9093")
        );
        assert_eq!(client.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(client.get("sasl.username"), Some("$ConnectionString"));
        assert_eq!(client.get("sasl.password"), Some(NAMESPACE));
        assert_eq!(client.get("group.id"), Some("$Default"));
        assert_eq!(client.get("enable.auto.commit"), Some("false"));
    }
}

//! Order relay stream infrastructure.
//!
//! Implements the [`relay::StreamConnector`] and [`relay::PartitionReceiver`]
//! traits for Azure Event Hubs and provides the receive loop that drives a
//! [`relay::MessageHandler`]:
//!
//! - [`EventHubConnector`] parses the Event Hubs connection string, connects to
//!   the namespace's Kafka-compatible endpoint, and opens an
//!   [`EventHubReceiver`] on one partition starting at the look-back instant.
//!
//! - [`Listener`] opens the receiver and dispatches every message event to the
//!   handler in its own task. Error events are logged and the loop carries on.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details and connection-string handling live
//! here. The [`relay`] crate sees only the port traits and
//! [`relay::StreamMessage`].
//!
//! ## Known gap
//!
//! No offsets are committed. Every start re-reads from five seconds before
//! wall-clock now, so a restart after a longer outage skips the messages
//! enqueued in between.

pub mod connection_string;
pub mod eventhub;
pub mod receive_loop;

pub use connection_string::ConnectionString;
pub use eventhub::{EventHubConnector, EventHubReceiver, KAFKA_PORT};
pub use receive_loop::{Listener, ListenerState, ReceiveSummary};

//! Core domain for the order relay.
//!
//! The relay listens to one partition of an event stream, pulls an order id
//! out of every message at a fixed position, and POSTs it to a processing
//! endpoint, optionally recording a telemetry event per order. This crate holds
//! everything about that flow that does not touch the network. Infrastructure
//! crates implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`SourceLabel`, `PartitionKey`, `OrderId`, etc.) |
//! | [`types`] | Message envelope, outbound payloads, start position, timestamps |
//! | [`errors`] | Startup and per-event error types |
//! | [`config`] | Validated, immutable listener configuration |
//! | [`ports`] | Connector, receiver, forwarder, and telemetry traits |
//! | [`extract`] | Body decoding and positional order-id extraction |
//! | [`handler`] | [`MessageHandler`], which composes the above per message |

pub mod config;
pub mod errors;
pub mod extract;
pub mod handler;
pub mod identifiers;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{ListenerConfig, RawListenerSettings, DEFAULT_FORWARD_TIMEOUT};
pub use errors::{
    ConfigError, ConnectorError, DecodeError, ForwardError, ReceiverError, TelemetryError,
};
pub use handler::{HandleReport, MessageHandler, StepOutcome};
pub use identifiers::{ConsumerGroup, DeliveryId, HubName, OrderId, PartitionKey, SourceLabel};
pub use ports::{OrderForwarder, PartitionReceiver, ReceiverEvent, StreamConnector, TelemetryReporter};
pub use types::{
    ForwardRequest, MessageMetadata, StartPosition, StreamMessage, TelemetryEventName, Timestamp,
    LOOK_BACK,
};

#[cfg(any(test, feature = "testing"))]
pub use ports::{MockOrderForwarder, MockStreamConnector, MockTelemetryReporter};

//! Port traits implemented by infrastructure crates.
//!
//! The relay defines *what* it needs from the outside world: a way to open a
//! partition receiver, a way to deliver a forward request, and a way to record
//! a telemetry event. The `listener`, `webhook`, and `insights` crates supply
//! the concrete transports.

use async_trait::async_trait;

use crate::errors::{ConnectorError, ForwardError, ReceiverError, TelemetryError};
use crate::types::{ForwardRequest, StartPosition, StreamMessage, TelemetryEventName};

/// One event produced by a live receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverEvent {
    /// A message read from the partition.
    Message(StreamMessage),
    /// A transport error. The receiver remains usable.
    Error(ReceiverError),
}

/// Opens a receiver on the configured partition.
///
/// Connecting and creating the receiver are both fallible; either failure is
/// fatal to the caller since nothing can be forwarded without a receiver.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Connects and returns a receiver that delivers messages enqueued after
    /// `start`.
    async fn open(&self, start: StartPosition)
        -> Result<Box<dyn PartitionReceiver>, ConnectorError>;
}

/// A live subscription to one partition.
///
/// The sequence is conceptually endless. `None` is returned only when the
/// underlying transport has been shut down and can never produce another
/// event.
#[async_trait]
pub trait PartitionReceiver: Send {
    /// Waits for the next message or error event.
    async fn next_event(&mut self) -> Option<ReceiverEvent>;
}

/// Delivers a forward request to the processing endpoint.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OrderForwarder: Send + Sync {
    /// Issues exactly one delivery attempt. No retries.
    async fn forward(&self, request: &ForwardRequest) -> Result<(), ForwardError>;
}

/// Records named telemetry events.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TelemetryReporter: Send + Sync {
    /// Records one event.
    async fn track_event(&self, name: &TelemetryEventName) -> Result<(), TelemetryError>;
}

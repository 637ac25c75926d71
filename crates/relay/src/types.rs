//! Shared value types for the order relay.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! structure that participates in processing: the message envelope delivered by
//! the transport, the receiver's start position, and the two outbound payloads
//! (the forward request body and the telemetry event name).

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, SourceLabel};

/// How far before "now" a freshly created receiver starts delivering events.
///
/// Applied once at startup relative to wall-clock time. Nothing is persisted,
/// so events older than this at restart time are never delivered.
pub const LOOK_BACK: Duration = Duration::from_millis(5000);

// ---------------------------------------------------------------------------
// Stream messages
// ---------------------------------------------------------------------------

/// Transport metadata attached to a received message.
///
/// Used for log correlation only; nothing downstream depends on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Partition the message was read from.
    pub partition: Option<i32>,

    /// Position of the message within its partition.
    pub offset: Option<i64>,

    /// Time the message was accepted by the stream, when the transport reports it.
    pub enqueued_at: Option<Timestamp>,
}

/// One message as delivered by the stream transport.
///
/// `body` is an opaque JSON value. Transports that receive raw bytes wrap them
/// in the byte-buffer envelope produced by [`StreamMessage::from_payload`]:
///
/// ```json
/// { "type": "Buffer", "data": [79, 82, 68, ...] }
/// ```
///
/// The message handler reads the `data` field back out of that envelope; see
/// [`crate::extract::decode_body`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Envelope holding the encoded payload under `data`.
    pub body: serde_json::Value,

    /// Where the message came from.
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl StreamMessage {
    /// Creates a message from an arbitrary JSON body.
    pub fn new(body: serde_json::Value, metadata: MessageMetadata) -> Self {
        Self { body, metadata }
    }

    /// Wraps raw payload bytes in the byte-buffer envelope.
    pub fn from_payload(payload: &[u8], metadata: MessageMetadata) -> Self {
        let body = serde_json::json!({
            "type": "Buffer",
            "data": payload,
        });
        Self { body, metadata }
    }
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// JSON body POSTed to the processing endpoint: `{"ID": "<order id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRequest {
    /// The extracted order identifier.
    #[serde(rename = "ID")]
    pub id: OrderId,
}

impl ForwardRequest {
    /// Creates the request body for one order.
    pub fn new(id: OrderId) -> Self {
        Self { id }
    }
}

/// Name of the telemetry event recorded for one forwarded order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TelemetryEventName(String);

impl TelemetryEventName {
    /// Builds `"Event Order <source>: <order id>"`.
    pub fn for_order(source: &SourceLabel, id: &OrderId) -> Self {
        Self(format!("Event Order {source}: {id}"))
    }

    /// Returns the event name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TelemetryEventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Receiver start position
// ---------------------------------------------------------------------------

/// The point in time after which a new receiver delivers messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPosition {
    after: Timestamp,
}

impl StartPosition {
    /// Starts delivering messages enqueued after `now - LOOK_BACK`.
    pub fn look_back_from(now: Timestamp) -> Self {
        let window = chrono::Duration::milliseconds(LOOK_BACK.as_millis() as i64);
        Self {
            after: Timestamp::from_utc(now.as_datetime() - window),
        }
    }

    /// Starts delivering messages enqueued after an explicit instant.
    pub fn after(instant: Timestamp) -> Self {
        Self { after: instant }
    }

    /// Returns the start instant.
    pub fn instant(self) -> Timestamp {
        self.after
    }
}

impl std::fmt::Display for StartPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "after {}", self.after)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a [`Timestamp`] from milliseconds since the Unix epoch.
    ///
    /// Returns `None` if the value is outside the representable range.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Returns milliseconds since the Unix epoch.
    pub fn unix_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

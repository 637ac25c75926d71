//! Error types for the order relay.
//!
//! The types split along the one line that matters for this daemon: whether a
//! failure stops the process or is isolated to a single message.
//!
//! - **Startup** ([`ConfigError`], [`ConnectorError`]): the listener cannot be
//!   built or cannot open its receiver. These are the only errors that reach
//!   the composition root, which exits non-zero.
//! - **Per-event** ([`ReceiverError`], [`DecodeError`], [`ForwardError`],
//!   [`TelemetryError`]): logged where they occur and discarded. None of them
//!   stops the receive loop.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Startup errors
// ---------------------------------------------------------------------------

/// The supplied configuration is invalid.
///
/// Produced at load time; the listener never starts with an invalid config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting was absent or empty.
    #[error("Missing required setting: {name}")]
    Missing {
        /// Environment name of the setting.
        name: &'static str,
    },

    /// A setting was present but could not be interpreted.
    #[error("Invalid setting {name}: {message}")]
    Invalid {
        /// Environment name of the setting.
        name: &'static str,
        /// Description of the problem.
        message: String,
    },
}

/// The stream connector could not open the stream or create the receiver.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connection string could not be parsed.
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// Neither the stream path nor the connection string named an event hub.
    #[error("No event hub name: set the stream path or include EntityPath in the connection string")]
    MissingHubName,

    /// The partition key is not a valid partition for this transport.
    #[error("Invalid partition '{partition}': {message}")]
    InvalidPartition {
        /// The configured partition key.
        partition: String,
        /// Description of the problem.
        message: String,
    },

    /// Connecting to the stream failed.
    #[error("Failed to open stream connection: {0}")]
    Connect(String),

    /// The connection opened but the partition receiver could not be created.
    #[error("Failed to create receiver for partition {partition}: {message}")]
    CreateReceiver {
        /// The partition the receiver was to be bound to.
        partition: String,
        /// Transport-supplied description.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Per-event errors
// ---------------------------------------------------------------------------

/// An error event reported asynchronously by a live receiver.
///
/// The receiver stays open after reporting one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Receiver error: {message}")]
pub struct ReceiverError {
    /// Transport-supplied description.
    pub message: String,
}

impl ReceiverError {
    /// Creates a receiver error from any displayable transport error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A message body could not be turned back into its payload bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body could not be serialized to text or re-parsed as JSON.
    #[error("Message body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body has no `data` field.
    #[error("Message body has no 'data' field")]
    MissingData,

    /// The `data` field is neither a byte array nor a string.
    #[error("Message 'data' field has unsupported shape: {found}")]
    UnsupportedData {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// The `data` array holds a non-numeric element.
    #[error("Message 'data' array has a non-numeric element at index {index}")]
    InvalidByte {
        /// Position of the offending element.
        index: usize,
    },
}

/// The forward request could not be delivered.
///
/// Delivery is best-effort; this error is logged and never retried.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The request could not be built (e.g. serialization of the body).
    #[error("Failed to build forward request: {0}")]
    Request(String),

    /// The request failed at the transport level (DNS, connect, TLS, timeout).
    #[error("Forward request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Processing endpoint returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
}

/// A telemetry event could not be recorded.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The event could not be submitted to the telemetry sink.
    #[error("Telemetry submission failed: {0}")]
    Submit(String),

    /// The telemetry sink rejected the event.
    #[error("Telemetry sink returned HTTP {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },
}

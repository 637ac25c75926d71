//! Newtype domain identifiers.
//!
//! Every configured name the listener passes between components is a distinct
//! newtype wrapping a `String`. This prevents accidentally interchanging, for
//! example, a [`PartitionKey`] with a [`HubName`] even though both are plain
//! strings in the environment.
//!
//! [`OrderId`] is deliberately *not* produced by the `string_id!` macro: the
//! positional extraction may legitimately yield an empty identifier, which
//! the configuration newtypes reject.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or whitespace only.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — configuration-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Label identifying the deployment that emits telemetry (e.g. `"orders-eu"`).
    ///
    /// Embedded verbatim in every telemetry event name.
    SourceLabel
}

impl SourceLabel {
    /// An empty label, used when no telemetry is emitted and the label is
    /// never embedded in an event name.
    pub fn unlabelled() -> Self {
        Self(String::new())
    }
}

string_id! {
    /// Partition the receiver binds to, exactly as configured.
    ///
    /// Event Hubs partition ids are small decimal integers (`"0"`, `"1"`, ...);
    /// transports that need the numeric form parse it themselves.
    PartitionKey
}

string_id! {
    /// Name of the event hub (the stream path) the receiver consumes from.
    HubName
}

string_id! {
    /// Name of the consumer group the receiver reads as.
    ConsumerGroup
}

impl ConsumerGroup {
    /// The consumer group every event hub is created with.
    pub fn default_group() -> Self {
        Self("$Default".to_string())
    }
}

// ---------------------------------------------------------------------------
// Identifiers — extracted from message payloads
// ---------------------------------------------------------------------------

/// The order identifier relayed to the processing endpoint.
///
/// Produced by positional extraction from the decoded message text. No format
/// or uniqueness is enforced: whatever characters occupy the extraction range
/// are forwarded verbatim, including the empty string for short payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wraps an already-extracted identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when extraction produced nothing (payload too short).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies the handling of one received message.
///
/// Generated fresh for every message; recorded on the handling span so the
/// decode, forward, and telemetry log lines of one message can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(Uuid);

impl DeliveryId {
    /// Generates a new random delivery identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

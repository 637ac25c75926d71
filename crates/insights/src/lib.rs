//! Order relay telemetry adapter.
//!
//! Implements [`relay::TelemetryReporter`] for Azure Application Insights by
//! POSTing custom-event envelopes to the ingestion service's `/v2/track`
//! endpoint. Only constructed when a telemetry key is configured; with no key
//! the composition root passes no reporter at all and no client exists.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Key parsing, envelope encoding, and HTTP transport live
//! here. The [`relay`] crate sees only [`relay::TelemetryReporter`].

mod envelope;
pub mod key;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use relay::{TelemetryError, TelemetryEventName, TelemetryReporter, Timestamp};

use crate::envelope::Envelope;
pub use crate::key::{InsightsKey, DEFAULT_INGESTION_ENDPOINT};

/// Per-request timeout for telemetry submissions.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// The reporter could not be constructed.
#[derive(Debug, Error)]
pub enum InsightsError {
    /// The telemetry key is neither a bare key nor a valid connection string.
    #[error("Invalid telemetry key: {0}")]
    InvalidKey(String),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Records custom events in Application Insights.
#[derive(Debug, Clone)]
pub struct ApplicationInsightsReporter {
    client: Client,
    key: InsightsKey,
    track_url: String,
    role: Option<String>,
}

impl ApplicationInsightsReporter {
    /// Creates a reporter from a raw telemetry key.
    ///
    /// `role` is recorded as the cloud role of every event so events from
    /// several listeners can be told apart.
    pub fn new(raw_key: &str, role: Option<String>) -> Result<Self, InsightsError> {
        let key = InsightsKey::parse(raw_key)?;
        let client = Client::builder().timeout(SUBMIT_TIMEOUT).build()?;
        Ok(Self {
            client,
            track_url: key.track_url(),
            key,
            role,
        })
    }

    /// The parsed key in use.
    pub fn key(&self) -> &InsightsKey {
        &self.key
    }
}

#[async_trait]
impl TelemetryReporter for ApplicationInsightsReporter {
    async fn track_event(&self, name: &TelemetryEventName) -> Result<(), TelemetryError> {
        let envelope = Envelope::event(
            self.key.instrumentation_key(),
            name,
            Timestamp::now(),
            self.role.as_deref(),
        );

        let response = self
            .client
            .post(&self.track_url)
            .json(&[envelope])
            .send()
            .await
            .map_err(|e| TelemetryError::Submit(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!(event = %name, "Telemetry event recorded");
        Ok(())
    }
}

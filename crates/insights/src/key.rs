//! Telemetry key parsing.
//!
//! The key may be given either as a bare instrumentation key (a GUID) or as an
//! Application Insights connection string:
//!
//! ```text
//! InstrumentationKey=<guid>;IngestionEndpoint=https://<region>.in.applicationinsights.azure.com/
//! ```

use crate::InsightsError;

/// Ingestion host used when the key does not name one.
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

/// Instrumentation key plus the ingestion endpoint to send events to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightsKey {
    instrumentation_key: String,
    ingestion_endpoint: String,
}

impl InsightsKey {
    /// Parses a bare key or a connection string.
    pub fn parse(raw: &str) -> Result<Self, InsightsError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InsightsError::InvalidKey("key is empty".to_string()));
        }

        if !raw.contains('=') {
            return Ok(Self {
                instrumentation_key: raw.to_string(),
                ingestion_endpoint: DEFAULT_INGESTION_ENDPOINT.to_string(),
            });
        }

        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;
        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            match name.trim().to_ascii_lowercase().as_str() {
                "instrumentationkey" => instrumentation_key = Some(value.trim().to_string()),
                "ingestionendpoint" => ingestion_endpoint = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| InsightsError::InvalidKey("missing InstrumentationKey".to_string()))?;
        let ingestion_endpoint = ingestion_endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_string());

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint: ingestion_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// The instrumentation key.
    pub fn instrumentation_key(&self) -> &str {
        &self.instrumentation_key
    }

    /// Base URL of the ingestion service, without trailing slash.
    pub fn ingestion_endpoint(&self) -> &str {
        &self.ingestion_endpoint
    }

    /// Full URL events are POSTed to.
    pub fn track_url(&self) -> String {
        format!("{}/v2/track", self.ingestion_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_key_uses_default_endpoint() {
        let key = InsightsKey::parse("11111111-2222-3333-4444-555555555555").unwrap();
        assert_eq!(key.instrumentation_key(), "11111111-2222-3333-4444-555555555555");
        assert_eq!(key.track_url(), "https://dc.services.visualstudio.com/v2/track");
    }

    #[test]
    fn test_connection_string() {
        let key = InsightsKey::parse(
            "InstrumentationKey=abc;IngestionEndpoint=https://westeurope-5.in.applicationinsights.azure.com/;LiveEndpoint=https://live",
        )
        .unwrap();
        assert_eq!(key.instrumentation_key(), "abc");
        assert_eq!(
            key.track_url(),
            "https://westeurope-5.in.applicationinsights.azure.com/v2/track"
        );
    }

    #[test]
    fn test_connection_string_without_endpoint() {
        let key = InsightsKey::parse("InstrumentationKey=abc").unwrap();
        assert_eq!(key.ingestion_endpoint(), DEFAULT_INGESTION_ENDPOINT);
    }

    #[test]
    fn test_connection_string_without_key_rejected() {
        assert!(InsightsKey::parse("IngestionEndpoint=https://example.com").is_err());
        assert!(InsightsKey::parse("  ").is_err());
    }
}

//! Application Insights ingestion envelope for custom events.

use std::collections::BTreeMap;

use serde::Serialize;

use relay::{TelemetryEventName, Timestamp};

#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a> {
    name: String,
    time: String,
    #[serde(rename = "iKey")]
    ikey: &'a str,
    tags: BTreeMap<&'static str, String>,
    data: Data<'a>,
}

#[derive(Debug, Serialize)]
struct Data<'a> {
    #[serde(rename = "baseType")]
    base_type: &'static str,
    #[serde(rename = "baseData")]
    base_data: EventData<'a>,
}

#[derive(Debug, Serialize)]
struct EventData<'a> {
    ver: u8,
    name: &'a str,
    properties: BTreeMap<String, String>,
}

impl<'a> Envelope<'a> {
    /// Builds a custom-event envelope stamped with `time`.
    pub(crate) fn event(
        instrumentation_key: &'a str,
        event: &'a TelemetryEventName,
        time: Timestamp,
        role: Option<&str>,
    ) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(
            "ai.internal.sdkVersion",
            concat!("rust:", env!("CARGO_PKG_VERSION")).to_string(),
        );
        if let Some(role) = role {
            tags.insert("ai.cloud.role", role.to_string());
        }

        Self {
            name: format!(
                "Microsoft.ApplicationInsights.{}.Event",
                instrumentation_key.replace('-', "")
            ),
            time: time.to_string(),
            ikey: instrumentation_key,
            tags,
            data: Data {
                base_type: "EventData",
                base_data: EventData {
                    ver: 2,
                    name: event.as_str(),
                    properties: BTreeMap::new(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay::{OrderId, SourceLabel};

    #[test]
    fn test_event_envelope_shape() {
        let name = TelemetryEventName::for_order(
            &SourceLabel::new("orders-eu").unwrap(),
            &OrderId::new("ABC123"),
        );
        let time = Timestamp::from_unix_millis(0).unwrap();
        let envelope = Envelope::event("aaaa-bbbb", &name, time, Some("orders-eu"));

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["name"], "Microsoft.ApplicationInsights.aaaabbbb.Event");
        assert_eq!(json["iKey"], "aaaa-bbbb");
        assert_eq!(json["time"], "1970-01-01T00:00:00+00:00");
        assert_eq!(json["tags"]["ai.cloud.role"], "orders-eu");
        assert_eq!(json["data"]["baseType"], "EventData");
        assert_eq!(json["data"]["baseData"]["ver"], 2);
        assert_eq!(
            json["data"]["baseData"]["name"],
            "Event Order orders-eu: ABC123"
        );
    }
}

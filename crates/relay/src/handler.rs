//! Per-message handling: decode, extract, forward, report.
//!
//! [`MessageHandler::handle`] never returns an error. Each step that can fail
//! is logged where it fails and the outcome is recorded in the returned
//! [`HandleReport`]; the caller's receive loop moves on to the next message
//! regardless.

use std::sync::Arc;

use tracing::{debug, error, info, warn, Instrument};

use crate::errors::ForwardError;
use crate::extract::{decode_body, decode_text, extract_order_id};
use crate::identifiers::{DeliveryId, OrderId, SourceLabel};
use crate::ports::{OrderForwarder, TelemetryReporter};
use crate::types::{ForwardRequest, StreamMessage, TelemetryEventName};

/// What happened to one side effect of handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The call was made and reported success.
    Succeeded,
    /// The call was made and failed; the failure has been logged.
    Failed,
    /// The call was not made (decode failed, or telemetry is disabled).
    Skipped,
}

/// Summary of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleReport {
    /// Correlation id recorded on every log line for this message.
    pub delivery_id: DeliveryId,
    /// The extracted order id; `None` when the body could not be decoded.
    pub order_id: Option<OrderId>,
    /// Outcome of the forward request.
    pub forward: StepOutcome,
    /// Outcome of the telemetry event.
    pub telemetry: StepOutcome,
}

/// Turns stream messages into forward requests and telemetry events.
///
/// Holds only immutable state, so one instance is shared (behind an `Arc`) by
/// every in-flight message.
pub struct MessageHandler {
    source: SourceLabel,
    forwarder: Arc<dyn OrderForwarder>,
    telemetry: Option<Arc<dyn TelemetryReporter>>,
}

impl MessageHandler {
    /// Creates a handler.
    ///
    /// Pass `telemetry: None` when no telemetry key is configured; the handler
    /// then makes no telemetry calls at all.
    pub fn new(
        source: SourceLabel,
        forwarder: Arc<dyn OrderForwarder>,
        telemetry: Option<Arc<dyn TelemetryReporter>>,
    ) -> Self {
        Self {
            source,
            forwarder,
            telemetry,
        }
    }

    /// Label used in telemetry event names.
    pub fn source(&self) -> &SourceLabel {
        &self.source
    }

    /// Handles one message end to end.
    pub async fn handle(&self, message: StreamMessage) -> HandleReport {
        let delivery_id = DeliveryId::new_random();
        let span = tracing::info_span!(
            "handle_message",
            delivery_id = %delivery_id,
            partition = ?message.metadata.partition,
            offset = ?message.metadata.offset,
        );

        self.handle_inner(delivery_id, message).instrument(span).await
    }

    async fn handle_inner(&self, delivery_id: DeliveryId, message: StreamMessage) -> HandleReport {
        let bytes = match decode_body(&message.body) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "Dropping message with undecodable body");
                return HandleReport {
                    delivery_id,
                    order_id: None,
                    forward: StepOutcome::Skipped,
                    telemetry: StepOutcome::Skipped,
                };
            }
        };

        let text = decode_text(&bytes);
        info!(text = %text, "Event received");

        let order_id = extract_order_id(&text);
        if order_id.is_empty() {
            warn!(
                length = text.chars().count(),
                "Message text too short to contain an order id; forwarding empty id"
            );
        }

        // Independent side effects: a slow endpoint must not hold back telemetry.
        let (forward, telemetry) = tokio::join!(self.forward(&order_id), self.report(&order_id));

        HandleReport {
            delivery_id,
            order_id: Some(order_id),
            forward,
            telemetry,
        }
    }

    async fn forward(&self, order_id: &OrderId) -> StepOutcome {
        let request = ForwardRequest::new(order_id.clone());
        match self.forwarder.forward(&request).await {
            Ok(()) => {
                debug!(order_id = %order_id, "Order forwarded");
                StepOutcome::Succeeded
            }
            Err(e @ ForwardError::Status { .. }) => {
                warn!(order_id = %order_id, error = %e, "Processing endpoint rejected order");
                StepOutcome::Failed
            }
            Err(e) => {
                error!(order_id = %order_id, error = %e, "Failed to forward order");
                StepOutcome::Failed
            }
        }
    }

    async fn report(&self, order_id: &OrderId) -> StepOutcome {
        let Some(telemetry) = &self.telemetry else {
            return StepOutcome::Skipped;
        };

        let name = TelemetryEventName::for_order(&self.source, order_id);
        match telemetry.track_event(&name).await {
            Ok(()) => StepOutcome::Succeeded,
            Err(e) => {
                error!(event = %name, error = %e, "Failed to record telemetry event");
                StepOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TelemetryError;
    use crate::ports::{MockOrderForwarder, MockTelemetryReporter};
    use crate::types::MessageMetadata;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify};

    fn message(text: &str) -> StreamMessage {
        StreamMessage::from_payload(text.as_bytes(), MessageMetadata::default())
    }

    fn source() -> SourceLabel {
        SourceLabel::new("orders-eu").unwrap()
    }

    #[tokio::test]
    async fn test_forwards_extracted_order_id() {
        let mut forwarder = MockOrderForwarder::new();
        forwarder
            .expect_forward()
            .withf(|req| req.id.as_str() == "ORDER-0001-ABCDEF-1234XX")
            .times(1)
            .returning(|_| Ok(()));

        let handler = MessageHandler::new(source(), Arc::new(forwarder), None);
        let report = handler
            .handle(message("XXXXXXXXXXORDER-0001-ABCDEF-1234XXXX"))
            .await;

        assert_eq!(report.forward, StepOutcome::Succeeded);
        assert_eq!(report.telemetry, StepOutcome::Skipped);
        assert_eq!(
            report.order_id.unwrap().as_str(),
            "ORDER-0001-ABCDEF-1234XX"
        );
    }

    #[tokio::test]
    async fn test_telemetry_event_name_includes_source() {
        let mut forwarder = MockOrderForwarder::new();
        forwarder.expect_forward().returning(|_| Ok(()));

        let mut telemetry = MockTelemetryReporter::new();
        telemetry
            .expect_track_event()
            .withf(|name| name.as_str() == "Event Order orders-eu: ABC123")
            .times(1)
            .returning(|_| Ok(()));

        let handler = MessageHandler::new(source(), Arc::new(forwarder), Some(Arc::new(telemetry)));
        let report = handler.handle(message("0123456789ABC123")).await;

        assert_eq!(report.telemetry, StepOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_no_telemetry_calls_when_disabled() {
        let mut forwarder = MockOrderForwarder::new();
        forwarder.expect_forward().times(2).returning(|_| Ok(()));

        let handler = MessageHandler::new(source(), Arc::new(forwarder), None);
        for text in ["0123456789ORDER-A", "0123456789ORDER-B"] {
            let report = handler.handle(message(text)).await;
            assert_eq!(report.telemetry, StepOutcome::Skipped);
        }
    }

    #[tokio::test]
    async fn test_forward_failure_does_not_block_telemetry() {
        let mut forwarder = MockOrderForwarder::new();
        forwarder
            .expect_forward()
            .returning(|_| Err(ForwardError::Transport("connection refused".to_string())));

        let mut telemetry = MockTelemetryReporter::new();
        telemetry.expect_track_event().times(1).returning(|_| Ok(()));

        let handler = MessageHandler::new(source(), Arc::new(forwarder), Some(Arc::new(telemetry)));
        let report = handler.handle(message("0123456789ORDER-1")).await;

        assert_eq!(report.forward, StepOutcome::Failed);
        assert_eq!(report.telemetry, StepOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_telemetry_failure_is_swallowed() {
        let mut forwarder = MockOrderForwarder::new();
        forwarder.expect_forward().times(1).returning(|_| Ok(()));

        let mut telemetry = MockTelemetryReporter::new();
        telemetry
            .expect_track_event()
            .returning(|_| Err(TelemetryError::Rejected { status: 400 }));

        let handler = MessageHandler::new(source(), Arc::new(forwarder), Some(Arc::new(telemetry)));
        let report = handler.handle(message("0123456789ORDER-1")).await;

        assert_eq!(report.forward, StepOutcome::Succeeded);
        assert_eq!(report.telemetry, StepOutcome::Failed);
    }

    #[tokio::test]
    async fn test_undecodable_body_skips_side_effects() {
        let mut forwarder = MockOrderForwarder::new();
        forwarder.expect_forward().never();
        let mut telemetry = MockTelemetryReporter::new();
        telemetry.expect_track_event().never();

        let handler = MessageHandler::new(source(), Arc::new(forwarder), Some(Arc::new(telemetry)));
        let bad = StreamMessage::new(serde_json::json!({ "type": "Buffer" }), MessageMetadata::default());
        let report = handler.handle(bad).await;

        assert!(report.order_id.is_none());
        assert_eq!(report.forward, StepOutcome::Skipped);
        assert_eq!(report.telemetry, StepOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_short_text_forwards_empty_id() {
        let mut forwarder = MockOrderForwarder::new();
        forwarder
            .expect_forward()
            .withf(|req| req.id.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let handler = MessageHandler::new(source(), Arc::new(forwarder), None);
        let report = handler.handle(message("short")).await;

        assert_eq!(report.forward, StepOutcome::Succeeded);
    }

    /// Forwarder that holds every request until released.
    struct HeldForwarder {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl OrderForwarder for HeldForwarder {
        async fn forward(&self, _request: &ForwardRequest) -> Result<(), ForwardError> {
            self.release.notified().await;
            Ok(())
        }
    }

    struct ChannelTelemetry {
        events: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl TelemetryReporter for ChannelTelemetry {
        async fn track_event(&self, name: &TelemetryEventName) -> Result<(), TelemetryError> {
            let _ = self.events.send(name.as_str().to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_telemetry_not_held_back_by_pending_forward() {
        let release = Arc::new(Notify::new());
        let (tx, mut events) = mpsc::unbounded_channel();
        let handler = Arc::new(MessageHandler::new(
            source(),
            Arc::new(HeldForwarder {
                release: Arc::clone(&release),
            }),
            Some(Arc::new(ChannelTelemetry { events: tx })),
        ));

        let handling = tokio::spawn({
            let handler = Arc::clone(&handler);
            async move { handler.handle(message("0123456789ABC123")).await }
        });

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("telemetry waited for the forward request")
            .unwrap();
        assert_eq!(event, "Event Order orders-eu: ABC123");
        assert!(!handling.is_finished());

        release.notify_one();
        let report = handling.await.unwrap();
        assert_eq!(report.forward, StepOutcome::Succeeded);
        assert_eq!(report.telemetry, StepOutcome::Succeeded);
    }
}

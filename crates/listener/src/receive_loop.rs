//! The receive loop: connector → receiver → one spawned task per message.
//!
//! The loop itself only pulls events and dispatches them. Each message is
//! handled in its own tokio task, so a slow or hung processing endpoint never
//! delays reading the next event from the partition. Finished tasks are reaped
//! opportunistically so the set of in-flight handles does not grow without
//! bound on a long-running receiver.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};

use relay::{
    ConnectorError, HandleReport, MessageHandler, PartitionKey, PartitionReceiver, ReceiverEvent,
    StartPosition, StepOutcome, StreamConnector, Timestamp,
};

/// Where the listener is in its lifecycle.
///
/// `Receiving` is the steady state for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Constructed, no connection yet.
    Idle,
    /// Receiver open, loop not yet started.
    Connected,
    /// Delivering events to the handler.
    Receiving,
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ListenerState::Idle => "idle",
            ListenerState::Connected => "connected",
            ListenerState::Receiving => "receiving",
        };
        f.write_str(name)
    }
}

/// Tallies of what the loop has seen. Only completed handler tasks count
/// toward the forward/telemetry fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    /// Message events dispatched to the handler.
    pub messages: u64,
    /// Error events reported by the receiver.
    pub receiver_errors: u64,
    /// Messages whose body could not be decoded.
    pub undecodable: u64,
    /// Forward requests that reported success.
    pub forwarded: u64,
    /// Forward requests that failed.
    pub forward_failures: u64,
    /// Telemetry events that failed.
    pub telemetry_failures: u64,
    /// Handler tasks that panicked.
    pub panicked: u64,
}

impl ReceiveSummary {
    fn record(&mut self, finished: Result<HandleReport, JoinError>) {
        let report = match finished {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Message handler task did not complete");
                self.panicked += 1;
                return;
            }
        };
        if report.order_id.is_none() {
            self.undecodable += 1;
        }
        match report.forward {
            StepOutcome::Succeeded => self.forwarded += 1,
            StepOutcome::Failed => self.forward_failures += 1,
            StepOutcome::Skipped => {}
        }
        if report.telemetry == StepOutcome::Failed {
            self.telemetry_failures += 1;
        }
    }
}

/// Binds a connector to a message handler for one partition.
pub struct Listener {
    connector: Arc<dyn StreamConnector>,
    handler: Arc<MessageHandler>,
    partition: PartitionKey,
    state: ListenerState,
}

impl Listener {
    /// Creates an idle listener.
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        handler: Arc<MessageHandler>,
        partition: PartitionKey,
    ) -> Self {
        Self {
            connector,
            handler,
            partition,
            state: ListenerState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Opens the receiver, starting [`relay::LOOK_BACK`] before now.
    ///
    /// Any error here is a startup failure: nothing can be forwarded without a
    /// receiver, so callers should treat it as fatal.
    pub async fn connect(&mut self) -> Result<Box<dyn PartitionReceiver>, ConnectorError> {
        let start = StartPosition::look_back_from(Timestamp::now());
        let receiver = self.connector.open(start).await?;
        self.transition(ListenerState::Connected);
        Ok(receiver)
    }

    /// Runs the receive loop until the receiver is exhausted.
    ///
    /// A live transport never exhausts, so in production this only returns
    /// when the surrounding task is dropped. When it does return, every
    /// dispatched message has finished handling.
    pub async fn receive(&mut self, mut receiver: Box<dyn PartitionReceiver>) -> ReceiveSummary {
        self.transition(ListenerState::Receiving);
        info!(partition = %self.partition, "Listening on partition");

        let mut summary = ReceiveSummary::default();
        let mut in_flight = JoinSet::new();

        while let Some(event) = receiver.next_event().await {
            match event {
                ReceiverEvent::Message(message) => {
                    summary.messages += 1;
                    let handler = Arc::clone(&self.handler);
                    in_flight.spawn(async move { handler.handle(message).await });
                }
                ReceiverEvent::Error(e) => {
                    summary.receiver_errors += 1;
                    error!(partition = %self.partition, error = %e, "Receiver reported an error");
                }
            }

            while let Some(finished) = in_flight.try_join_next() {
                summary.record(finished);
            }
        }

        info!(partition = %self.partition, "Receiver closed; draining in-flight messages");
        while let Some(finished) = in_flight.join_next().await {
            summary.record(finished);
        }
        summary
    }

    /// Connects, then receives until the receiver is exhausted.
    pub async fn run(&mut self) -> Result<ReceiveSummary, ConnectorError> {
        let receiver = self.connect().await?;
        Ok(self.receive(receiver).await)
    }

    fn transition(&mut self, next: ListenerState) {
        info!(from = %self.state, to = %next, partition = %self.partition, "Listener state change");
        self.state = next;
    }
}

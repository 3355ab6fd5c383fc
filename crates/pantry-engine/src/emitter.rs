//! Per-query event channel.
//!
//! One publisher/stream pair exists per query. The publisher assigns
//! strictly increasing sequence numbers, enforces exactly one terminal
//! event, and trips the query's cancellation token when the subscriber
//! disconnects so the orchestrator stops issuing tool calls.

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use pantry_core::event::{EventKind, ProgressEvent};

/// Buffered events per query; progress streams are short.
const EVENT_BUFFER: usize = 32;

/// Creates the publisher/stream pair for one query.
///
/// Dropping the stream cancels the token, so the orchestrator stops
/// planning as soon as the subscriber walks away. A cancel after the
/// terminal event is harmless; the run is already over.
pub fn channel() -> (EventPublisher, QueryStream) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let cancel = CancellationToken::new();

    (
        EventPublisher {
            tx,
            cancel: cancel.clone(),
            next_sequence: 0,
            terminal_sent: false,
        },
        QueryStream {
            rx,
            _disconnect_guard: cancel.drop_guard(),
        },
    )
}

/// Sending half: owned by the orchestrator for one query.
pub struct EventPublisher {
    tx: mpsc::Sender<ProgressEvent>,
    cancel: CancellationToken,
    next_sequence: u64,
    terminal_sent: bool,
}

impl EventPublisher {
    /// Token tripped on subscriber disconnect (or explicitly by the
    /// orchestrator's owner).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Emits a progress event for one orchestration step.
    pub async fn progress(&mut self, node_name: &str, step_description: impl Into<String>) {
        self.send(EventKind::Progress, node_name, step_description.into())
            .await;
    }

    /// Emits the final answer and closes the stream.
    pub async fn finish(&mut self, answer: impl Into<String>) {
        self.send(EventKind::Final, "answer", answer.into()).await;
    }

    /// Emits the terminal error and closes the stream.
    pub async fn fail(&mut self, description: impl Into<String>) {
        self.send(EventKind::Error, "abort", description.into()).await;
    }

    /// Whether a terminal event has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.terminal_sent
    }

    async fn send(&mut self, kind: EventKind, node_name: &str, step_description: String) {
        if self.terminal_sent {
            debug!(?kind, node_name, "event after terminal dropped");
            return;
        }
        let event = ProgressEvent {
            kind,
            step_description,
            node_name: node_name.to_string(),
            sequence_number: self.next_sequence,
        };
        self.next_sequence += 1;
        if kind.is_terminal() {
            self.terminal_sent = true;
        }
        if self.tx.send(event).await.is_err() {
            debug!("subscriber disconnected, cancelling query");
            self.cancel.cancel();
        }
    }
}

/// Receiving half: handed to the caller of `handle_query`.
pub struct QueryStream {
    rx: mpsc::Receiver<ProgressEvent>,
    _disconnect_guard: DropGuard,
}

impl QueryStream {
    /// Next event, or `None` once the stream is closed after its terminal
    /// event.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Drains the stream to completion (terminal event last).
    pub async fn collect_all(mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }
}

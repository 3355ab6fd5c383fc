//! Progress events published to the query subscriber.

use serde::{Deserialize, Serialize};

/// Discriminates progress notifications from the two terminal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Progress,
    Final,
    Error,
}

impl EventKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Final | Self::Error)
    }
}

/// One entry in a query's ordered event stream.
///
/// `sequence_number` is strictly increasing within one query; exactly one
/// `Final` or `Error` event terminates the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub step_description: String,
    /// The orchestration node that produced the event (a tool name,
    /// "answer", or "abort").
    pub node_name: String,
    pub sequence_number: u64,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

//! Common types and data structures

use std::collections::HashMap;
use std::fmt;

/// Identifier of a node on the canvas. Never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who wrote a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
    System,
}

impl Author {
    /// Role name used in the chat-completions payload
    pub fn role(self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Assistant => "assistant",
            Author::System => "system",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Author::User => "You",
            Author::Assistant => "Assistant",
            Author::System => "System",
        }
    }
}

/// Lifecycle of a single streamed completion
#[derive(Clone, Debug, PartialEq)]
pub enum StreamStatus {
    Connecting,
    Streaming,
    Complete,
    Cancelled,
    Failed(String),
}

impl StreamStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamStatus::Complete | StreamStatus::Cancelled | StreamStatus::Failed(_)
        )
    }
}

/// Progress of one completion, written by the streaming task and drained by the UI
#[derive(Clone, Debug)]
pub struct StreamProgress {
    pub pending: String,  // text received but not yet applied to the node
    pub status: StreamStatus,
    pub received_chars: usize,
}

impl Default for StreamProgress {
    fn default() -> Self {
        Self {
            pending: String::new(),
            status: StreamStatus::Connecting,
            received_chars: 0,
        }
    }
}

/// Shared state for all in-flight completions
#[derive(Default)]
pub struct StreamState {
    pub streams: HashMap<NodeId, StreamProgress>, // assistant node -> progress
}

impl StreamState {
    pub fn active_count(&self) -> usize {
        self.streams
            .values()
            .filter(|p| !p.status.is_terminal())
            .count()
    }
}

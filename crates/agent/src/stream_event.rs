//! Agent-level streaming events.
//!
//! A run is a finite sequence of snapshots of the growing response,
//! closed by exactly one `done` or `error` event.

use serde::{Deserialize, Serialize};
use webseek_core::message::Message;

/// Events emitted by the agent during a run.
///
/// - `snapshot` : the response so far, including partial model output
/// - `tool_call`: a tool is about to run with these (enhanced) arguments
/// - `done`     : the final response
/// - `error`    : the run failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Accumulated response plus the current partial model output.
    Snapshot { messages: Vec<Message> },

    /// The agent is calling a tool.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },

    /// The run is complete.
    Done {
        messages: Vec<Message>,
        llm_calls: u32,
        tool_calls_made: u32,
        budget_exhausted: bool,
    },

    /// An error ended the run.
    Error { message: String },
}

impl AgentStreamEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::ToolCall { .. } => "tool_call",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

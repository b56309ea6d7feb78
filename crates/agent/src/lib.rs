//! The search agent for WebSeek.
//!
//! The agent follows a **Reason → Act → Observe** cycle over two web tools:
//!
//! 1. **Prepare** the transcript (date-stamped user text, instruction prefix, system prompt)
//! 2. **Stream** a model turn, surfacing partial output as it arrives
//! 3. **If tool calls**: date-stamp search queries, run each tool in order, append results, loop
//! 4. **If no tool call**: the run is complete
//!
//! The loop is bounded by a per-run budget of model calls. A configured
//! secondary agent may take a follow-up pass over the finished transcript.

pub mod budget;
pub mod detect;
pub mod error;
pub mod history;
pub mod prompt;
pub mod search_agent;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use budget::RunBudget;
pub use detect::detect_tool_calls;
pub use error::AgentError;
pub use history::trim_history;
pub use prompt::{REACT_USER_PROMPT, SystemPrompt};
pub use search_agent::{Clock, RunSummary, SearchAgent, handoff_transcript};
pub use stream_event::AgentStreamEvent;

//! Tool-call detection in model output.
//!
//! The completion service may return native function calls, or it may
//! write calls into the text as `<tool_call>{"name": .., "arguments": ..}</tool_call>`
//! blocks. Native calls win when both are present.

use tracing::warn;
use webseek_core::message::{Message, Role};
use webseek_core::tool::ToolCall;

const OPEN_TAG: &str = "<tool_call>";
const CLOSE_TAG: &str = "</tool_call>";

/// Arguments as JSON; text that is not JSON is passed through as a string
/// for the tool to interpret.
fn parse_arguments(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// Every tool-call intent in an assistant message, in the order written.
pub fn detect_tool_calls(message: &Message) -> Vec<ToolCall> {
    if message.role != Role::Assistant {
        return Vec::new();
    }

    if !message.tool_calls.is_empty() {
        return message
            .tool_calls
            .iter()
            .map(|tc| ToolCall {
                id: Some(tc.id.clone()),
                name: tc.name.clone(),
                arguments: parse_arguments(&tc.arguments),
            })
            .collect();
    }

    text_tool_calls(&message.text())
}

/// Parse `<tool_call>` blocks. An unclosed final block runs to the end of the text.
pub fn text_tool_calls(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN_TAG) {
        let after = &rest[start + OPEN_TAG.len()..];
        let (body, next) = match after.find(CLOSE_TAG) {
            Some(end) => (&after[..end], &after[end + CLOSE_TAG.len()..]),
            None => (after, ""),
        };
        rest = next;

        match parse_block(body.trim()) {
            Some(call) => calls.push(call),
            None => warn!(block = body.trim(), "Ignoring unparseable tool call block"),
        }
    }

    calls
}

fn parse_block(body: &str) -> Option<ToolCall> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let name = value.get("name")?.as_str()?.to_string();
    let arguments = match value.get("arguments") {
        Some(serde_json::Value::String(raw)) => parse_arguments(raw),
        Some(other) => other.clone(),
        None => serde_json::Value::Object(serde_json::Map::new()),
    };
    Some(ToolCall::new(name, arguments))
}

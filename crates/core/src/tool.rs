//! Tool trait: the abstraction over agent capabilities.
//!
//! The agent has exactly two capabilities: web search and page visit.
//! They form a closed set ([`ToolKind`]); dispatch is a match on the kind,
//! not a lookup by arbitrary string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The tools a model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Search,
    Visit,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::Search, ToolKind::Visit];

    /// The name exposed in tool schemas.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Visit => "visit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "search" => Some(Self::Search),
            "visit" => Some(Self::Visit),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tool-call intent extracted from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID for native function calls; `None` for calls parsed from text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Name of the tool to execute, as the model wrote it
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    pub fn kind(&self) -> Option<ToolKind> {
        ToolKind::from_name(&self.name)
    }
}

/// The result of a tool invocation. Always plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,

    /// Tool name as requested
    pub name: String,

    /// Whether the tool ran to completion without an error
    pub success: bool,

    /// The text handed back to the model
    pub output: String,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which of the fixed tools this is.
    fn kind(&self) -> ToolKind;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments, returning its text output.
    ///
    /// Per-item failures inside a batch are rendered inline by the tool.
    /// An `Err` means the whole call failed.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.kind().name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The orchestrator uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Invoke tools when the LLM requests them
pub struct ToolRegistry {
    tools: BTreeMap<ToolKind, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool of the same kind.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    /// Get a tool by kind.
    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.get(&kind).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM), in kind order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call, propagating the tool's error.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<String, ToolError> {
        let tool = call
            .kind()
            .and_then(|kind| self.tools.get(&kind))
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(call.arguments.clone()).await
    }

    /// Execute a tool call and render any failure as the result text.
    ///
    /// This is the boundary the orchestrator calls: it never fails.
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let (success, output) = match self.execute(call).await {
            Ok(output) => (true, output),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                (false, e.to_string())
            }
        };
        ToolResult {
            call_id: call.id.clone(),
            name: call.name.clone(),
            success,
            output,
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().map(|k| k.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

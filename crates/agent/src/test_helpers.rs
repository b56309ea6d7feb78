//! Shared test helpers for agent tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use webseek_core::error::{ProviderError, ToolError};
use webseek_core::message::{Message, MessageToolCall};
use webseek_core::provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
use webseek_core::tool::{Tool, ToolKind, ToolRegistry};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call returns the next response in the queue and records the
/// request. Streaming splits the text into `pieces` chunks.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
    pieces: usize,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            pieces: 1,
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Stream each response's text in this many chunks.
    pub fn with_pieces(mut self, pieces: usize) -> Self {
        self.pieces = pieces.max(1);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: ProviderRequest) -> ProviderResponse {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();
        if call >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }
        requests.push(request);
        responses[call].clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(self.next(request))
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>, ProviderError> {
        let response = self.next(request);
        let text = response.message.text();
        let chars: Vec<char> = text.chars().collect();
        let size = chars.len().div_ceil(self.pieces).max(1);

        let mut chunks: Vec<StreamChunk> = chars
            .chunks(size)
            .map(|piece| StreamChunk {
                content: Some(piece.iter().collect()),
                tool_calls: vec![],
                done: false,
                usage: None,
            })
            .collect();
        chunks.push(StreamChunk {
            content: None,
            tool_calls: response.message.tool_calls,
            done: true,
            usage: response.usage,
        });

        let (tx, rx) = tokio::sync::mpsc::channel(chunks.len());
        for chunk in chunks {
            let _ = tx.send(Ok(chunk)).await;
        }
        Ok(rx)
    }
}

/// A provider whose stream fails on the first call.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
        metadata: serde_json::Map::new(),
    }
}

/// Create a response with native tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut response = make_text_response(thought);
    response.message.tool_calls = tool_calls;
    response
}

/// Helper to create a native tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A tool that records its arguments and answers with a fixed text.
pub struct RecordingTool {
    kind: ToolKind,
    reply: String,
    pub calls: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl RecordingTool {
    pub fn new(kind: ToolKind, reply: &str) -> Self {
        Self {
            kind,
            reply: reply.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn description(&self) -> &str {
        "Records its arguments"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(arguments);
        if self.reply.is_empty() {
            return Err(ToolError::Transport("tool backend unavailable".into()));
        }
        Ok(self.reply.clone())
    }
}

/// Registry with recording search and visit tools; returns the call logs.
pub fn recording_registry() -> (
    Arc<ToolRegistry>,
    Arc<Mutex<Vec<serde_json::Value>>>,
    Arc<Mutex<Vec<serde_json::Value>>>,
) {
    let search = RecordingTool::new(ToolKind::Search, "search results");
    let visit = RecordingTool::new(ToolKind::Visit, "page summary");
    let search_calls = Arc::clone(&search.calls);
    let visit_calls = Arc::clone(&visit.calls);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(search));
    registry.register(Box::new(visit));
    (Arc::new(registry), search_calls, visit_calls)
}

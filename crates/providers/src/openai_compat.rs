//! OpenAI-compatible completion service client.
//!
//! Works with OpenAI, vLLM, SGLang, one-api gateways and any other endpoint
//! exposing `/v1/chat/completions`.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Native function calling, plus `<tool_response>` turns for tools the
//!   model called through its text protocol
//! - Strict JSON responses (`response_format: json_object`)
//! - Sampling seeds

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};
use webseek_core::error::ProviderError;
use webseek_core::message::{Message, MessageToolCall, Role};
use webseek_core::provider::*;

/// An OpenAI-compatible completion service.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_timeout(name, base_url, api_key, std::time::Duration::from_secs(300))
    }

    /// Create a provider with a custom whole-request timeout.
    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages.iter().map(ApiMessage::from_message).collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the JSON request body shared by both request modes.
    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }
        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }
        if let Some(seed) = request.seed {
            body["seed"] = serde_json::json!(seed);
        }
        if request.json_output {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }

    async fn post(
        &self,
        body: &serde_json::Value,
        stream: bool,
    ) -> std::result::Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response),
            429 => Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            }),
            401 | 403 => Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            )),
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_body,
                })
            }
        }
    }
}

#[async_trait]
impl webseek_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = Self::request_body(&request, false);
        debug!(provider = %self.name, model = %request.model, json = request.json_output, "Sending completion request");

        let response = self.post(&body, false).await?;
        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        message.tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ProviderResponse {
            message,
            usage: api_response.usage.map(Usage::from),
            model: api_response.model,
            metadata: serde_json::Map::new(),
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let body = Self::request_body(&request, true);
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post(&body, true).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream and forward parsed chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut parser = SseParser::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for chunk in parser.feed(&bytes, &provider_name) {
                    let done = chunk.done;
                    if tx.send(Ok(chunk)).await.is_err() {
                        return; // receiver dropped
                    }
                    if done {
                        return;
                    }
                }
            }

            // Stream ended without [DONE]
            let _ = tx.send(Ok(parser.finish())).await;
        });

        Ok(rx)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

/// Incremental parser for an OpenAI SSE body.
///
/// Bytes are buffered until a full line arrives, so a multi-byte character
/// split across network reads is decoded intact. Content deltas are emitted
/// as they arrive. Tool-call deltas are accumulated by index and emitted
/// once, complete, on the final chunk together with the last reported usage.
#[derive(Default)]
struct SseParser {
    buffer: Vec<u8>,
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    usage: Option<Usage>,
}

impl SseParser {
    /// Feed raw bytes; returns chunks completed by them. A chunk with
    /// `done == true` ends the stream.
    fn feed(&mut self, bytes: &[u8], provider: &str) -> Vec<StreamChunk> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);

            // Blank separators and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                out.push(self.finish());
                return out;
            }

            let stream_resp = match serde_json::from_str::<StreamResponse>(data) {
                Ok(r) => r,
                Err(e) => {
                    trace!(provider = %provider, data = %data, error = %e, "Ignoring unparseable SSE chunk");
                    continue;
                }
            };

            // Some gateways repeat usage on every chunk; keep the latest.
            if let Some(usage) = stream_resp.usage {
                self.usage = Some(usage.into());
            }

            if let Some(choice) = stream_resp.choices.into_iter().next() {
                for delta in choice.delta.tool_calls.unwrap_or_default() {
                    let acc = self.tool_calls.entry(delta.index).or_default();
                    if let Some(id) = delta.id {
                        acc.id = id;
                    }
                    if let Some(func) = delta.function {
                        if let Some(name) = func.name {
                            acc.name = name;
                        }
                        if let Some(args) = func.arguments {
                            acc.arguments.push_str(&args);
                        }
                    }
                }

                if choice.delta.content.as_ref().is_some_and(|c| !c.is_empty()) {
                    out.push(StreamChunk {
                        content: choice.delta.content,
                        tool_calls: Vec::new(),
                        done: false,
                        usage: None,
                    });
                }
            }
        }

        out
    }

    /// The terminal chunk carrying every accumulated tool call.
    fn finish(&mut self) -> StreamChunk {
        StreamChunk {
            content: None,
            tool_calls: std::mem::take(&mut self.tool_calls)
                .into_values()
                .map(ToolCallAccumulator::into_tool_call)
                .collect(),
            done: true,
            usage: self.usage.take(),
        }
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn from_message(m: &Message) -> Self {
        let text = m.text();

        // A tool result without a call ID answers a call the model wrote in
        // its text protocol; it goes back as a user turn in the same protocol.
        if m.role == Role::Tool && m.tool_call_id.is_none() {
            return Self {
                role: "user".into(),
                content: Some(format!("<tool_response>\n{text}\n</tool_response>")),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            };
        }

        Self {
            role: m.role.as_str().into(),
            content: Some(text),
            name: None,
            tool_calls: if m.tool_calls.is_empty() {
                None
            } else {
                Some(
                    m.tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: m.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta: arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates incremental tool call deltas into a complete tool call.
#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn into_tool_call(self) -> MessageToolCall {
        MessageToolCall {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webseek_core::Provider;

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("vllm", "http://localhost:8000/v1/", "none");
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn native_tool_result_keeps_tool_role() {
        let msg = Message::tool_result("search", Some("call_1".into()), "result data");
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(api_msgs[0].content.as_deref(), Some("result data"));
    }

    #[test]
    fn textual_tool_result_becomes_tool_response_turn() {
        let msg = Message::tool_result("search", None, "1. [Paris](https://paris.fr)");
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "user");
        assert_eq!(
            api_msgs[0].content.as_deref(),
            Some("<tool_response>\n1. [Paris](https://paris.fr)\n</tool_response>")
        );
        assert!(api_msgs[0].tool_call_id.is_none());
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let mut msg = Message::assistant("thinking...");
        msg.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "search".into(),
            arguments: r#"{"query":"rust"}"#.into(),
        }];
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc.len(), 1);
        assert_eq!(tc[0].function.name, "search");
    }

    #[test]
    fn request_body_carries_generation_options() {
        let mut request = ProviderRequest::new("web-dancer", vec![Message::user("hi")]);
        request.seed = Some(42);
        request.max_tokens = Some(10000);
        request.tools = vec![ToolDefinition {
            name: "search".into(),
            description: "Web search".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];

        let body = OpenAiCompatProvider::request_body(&request, true);
        assert_eq!(body["seed"], 42);
        assert_eq!(body["max_tokens"], 10000);
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "search");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn json_output_sets_response_format() {
        let mut request = ProviderRequest::new("gpt-4o-mini", vec![]);
        request.json_output = true;
        let body = OpenAiCompatProvider::request_body(&request, false);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("seed").is_none());
        assert!(body.get("stream_options").is_none());
    }

    // --- SSE parsing tests ---

    #[test]
    fn parser_emits_content_deltas() {
        let mut parser = SseParser::default();
        let chunks = parser.feed(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "test",
        );
        let text: Vec<_> = chunks.iter().filter_map(|c| c.content.as_deref()).collect();
        assert_eq!(text, vec!["Hel", "lo"]);
        assert!(chunks.iter().all(|c| !c.done));
    }

    #[test]
    fn parser_handles_lines_split_across_reads() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"data: {\"choices\":[{\"delta\":{\"con", "test").is_empty());
        let chunks = parser.feed(b"tent\":\"Hi\"}}]}\n", "test");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content.as_deref(), Some("Hi"));
    }

    #[test]
    fn parser_assembles_tool_calls_on_done() {
        let mut parser = SseParser::default();
        let mut chunks = parser.feed(
            concat!(
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"search","arguments":""}}]}}]}"#, "\n",
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"query\":"}}]}}]}"#, "\n",
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"rust\"}"}}]}}]}"#, "\n",
                "data: [DONE]\n",
            )
            .as_bytes(),
            "test",
        );
        assert_eq!(chunks.len(), 1);
        let done = chunks.remove(0);
        assert!(done.done);
        assert_eq!(done.tool_calls.len(), 1);
        assert_eq!(done.tool_calls[0].id, "call_a");
        assert_eq!(done.tool_calls[0].name, "search");
        assert_eq!(done.tool_calls[0].arguments, r#"{"query":"rust"}"#);
    }

    #[test]
    fn parser_orders_parallel_tool_calls_by_index() {
        let mut parser = SseParser::default();
        parser.feed(
            concat!(
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_b","function":{"name":"visit","arguments":"{}"}},{"index":0,"id":"call_a","function":{"name":"search","arguments":"{}"}}]}}]}"#,
                "\n"
            )
            .as_bytes(),
            "test",
        );
        let done = parser.finish();
        let names: Vec<_> = done.tool_calls.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["search", "visit"]);
    }

    #[test]
    fn usage_on_every_chunk_does_not_end_the_stream() {
        let mut parser = SseParser::default();
        let chunks = parser.feed(
            concat!(
                r#"data: {"choices":[{"delta":{"content":"Hel"}}],"usage":{"prompt_tokens":10,"completion_tokens":1,"total_tokens":11}}"#, "\n",
                r#"data: {"choices":[{"delta":{"content":"lo"}}],"usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#, "\n",
            )
            .as_bytes(),
            "test",
        );
        let text: Vec<_> = chunks.iter().filter_map(|c| c.content.as_deref()).collect();
        assert_eq!(text, vec!["Hel", "lo"]);
        assert!(chunks.iter().all(|c| !c.done));

        let done = parser.feed(b"data: [DONE]\n", "test");
        assert_eq!(done.len(), 1);
        assert!(done[0].done);
        assert_eq!(done[0].usage.as_ref().unwrap().total_tokens, 12);
    }

    #[test]
    fn usage_only_chunk_is_reported_on_finish() {
        let mut parser = SseParser::default();
        let chunks = parser.feed(
            b"data: {\"choices\":[],\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":5,\"total_tokens\":15}}\n",
            "test",
        );
        assert!(chunks.is_empty());
        let done = parser.finish();
        assert!(done.done);
        assert_eq!(done.usage.as_ref().unwrap().total_tokens, 15);
    }

    #[test]
    fn cjk_character_split_across_reads_is_kept_intact() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"今天天气\"}}]}\n".as_bytes();
        // Cut inside the three-byte encoding of the first character.
        let cut = line.iter().position(|b| *b >= 0x80).unwrap() + 1;

        let mut parser = SseParser::default();
        assert!(parser.feed(&line[..cut], "test").is_empty());
        let chunks = parser.feed(&line[cut..], "test");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content.as_deref(), Some("今天天气"));
    }

    #[test]
    fn parser_skips_comments_and_garbage() {
        let mut parser = SseParser::default();
        let chunks = parser.feed(b": keep-alive\n\ndata: not-json\nevent: ping\n", "test");
        assert!(chunks.is_empty());
    }
}

//! End-to-end integration tests for the WebSeek agent.
//!
//! These tests run the full pipeline from user question to final response:
//! date rewriting, the reason/act loop, the search and visit tools and the
//! HTTP seam underneath them, with scripted backends at the edges.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use webseek_agent::{AgentStreamEvent, SearchAgent};
use webseek_config::AppConfig;
use webseek_core::error::{ProviderError, ToolError};
use webseek_core::event::EventBus;
use webseek_core::message::{Message, MessageToolCall, Role};
use webseek_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use webseek_core::temporal::Language;
use webseek_core::tool::{ToolCall, ToolRegistry};
use webseek_tools::{HttpClient, HttpRequest, HttpResponse, SEPARATOR};

// ── Scripted completion service ──────────────────────────────────────────

/// Returns scripted responses in sequence and records every request.
/// The last response repeats once the script runs out.
struct ScriptedProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len().min(self.responses.len() - 1);
        requests.push(request);
        Ok(self.responses[index].clone())
    }
}

fn text_response(text: &str) -> ProviderResponse {
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

fn tool_response(name: &str, args: serde_json::Value, thought: &str) -> ProviderResponse {
    let mut response = text_response(thought);
    response.message.tool_calls = vec![MessageToolCall {
        id: format!("call_{name}"),
        name: name.into(),
        arguments: args.to_string(),
    }];
    response
}

// ── Scripted web ─────────────────────────────────────────────────────────

const READER: &str = "https://reader.test/";

/// Serves search results and page text; records every request.
struct ScriptedWeb {
    search_delays_ms: HashMap<String, u64>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedWeb {
    fn new() -> Self {
        Self {
            search_delays_ms: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(mut self, query: &str, ms: u64) -> Self {
        self.search_delays_ms.insert(query.into(), ms);
        self
    }

    fn searched(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.query_param("q").map(str::to_string))
            .collect()
    }

    fn search_requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.query_param("q").is_some())
            .cloned()
            .collect()
    }

    fn page_reads(&self, url: &str) -> usize {
        let target = format!("{READER}{url}");
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == target)
            .count()
    }
}

#[async_trait::async_trait]
impl HttpClient for ScriptedWeb {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, ToolError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(q) = request.query_param("q") {
            let q = q.to_string();
            if let Some(ms) = self.search_delays_ms.get(&q) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            let body = serde_json::json!({
                "items": [{ "title": format!("{q} title"), "link": "https://forecast.example", "snippet": format!("about {q}") }]
            });
            return Ok(HttpResponse::ok(body.to_string()));
        }

        let target = request.url.strip_prefix(READER).unwrap_or_default();
        if target.contains("unreachable") {
            return Err(ToolError::Transport("connection refused".into()));
        }
        Ok(HttpResponse::ok(format!(
            "<h1>Forecast</h1>\n<p>Paris weather: sunny, 18C</p>\nSource {target}"
        )))
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────

/// 2026-10-18 10:00 in UTC+8 (a Sunday).
fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 2, 0, 0).unwrap()
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.search.api_key = Some("g-key".into());
    config.search.engine_id = Some("cse".into());
    config.reader.endpoint = READER.into();
    config.temporal.language = Language::En;
    config.agent.reasoning = false;
    config
}

fn registry(config: &AppConfig, web: Arc<ScriptedWeb>) -> Arc<ToolRegistry> {
    Arc::new(webseek_tools::build_registry_with(config, web, None))
}

fn agent(config: &AppConfig, provider: Arc<ScriptedProvider>, web: Arc<ScriptedWeb>) -> SearchAgent {
    SearchAgent::from_config(config, provider, registry(config, web), Arc::new(EventBus::default()))
        .with_clock(fixed_clock)
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_paris_tomorrow_is_dated_before_the_model_and_the_search() {
    let config = test_config();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(
            "search",
            serde_json::json!({"query": ["weather tomorrow in Paris"]}),
            "I should search the forecast.",
        ),
        text_response("<answer>Sunny, 18C</answer>"),
    ]));
    let web = Arc::new(ScriptedWeb::new());
    let agent = agent(&config, provider.clone(), web.clone());

    let summary = agent
        .run_to_completion(&[Message::user("What is the weather tomorrow in Paris?")])
        .await
        .unwrap();

    // The model never saw the relative phrase.
    let first = provider.requests()[0].clone();
    let question = first
        .messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.text())
        .unwrap();
    assert!(question.ends_with("What is the weather 2026-10-19 Monday in Paris?"));
    assert!(!question.contains("tomorrow in Paris"));
    assert_eq!(first.messages[0].role, Role::System);
    assert!(first.messages[0].text().contains("[2026-10-18 Sunday]"));

    // The search tool received the same absolute date.
    assert_eq!(web.searched(), vec!["weather 2026-10-19 Monday in Paris"]);

    assert_eq!(summary.llm_calls, 2);
    assert_eq!(summary.tool_calls_made, 1);
    assert!(!summary.budget_exhausted);
    assert_eq!(summary.answer().as_deref(), Some("Sunny, 18C"));

    let tool_message = summary.messages.iter().find(|m| m.role == Role::Tool).unwrap();
    assert!(tool_message.text().starts_with(
        "A web search for 'weather 2026-10-19 Monday in Paris' found 1 results:"
    ));
}

#[tokio::test]
async fn e2e_question_without_relative_dates_is_unchanged() {
    let mut config = test_config();
    config.agent.custom_user_prompt = Some(String::new());
    let provider = Arc::new(ScriptedProvider::new(vec![text_response("<answer>Paris</answer>")]));
    let agent = agent(&config, provider.clone(), Arc::new(ScriptedWeb::new()));

    agent
        .run_to_completion(&[Message::user("What is the capital of France?")])
        .await
        .unwrap();

    let request = &provider.requests()[0];
    assert_eq!(request.messages.last().unwrap().text(), "What is the capital of France?");
}

#[tokio::test]
async fn e2e_turn_without_tool_intent_ends_the_run() {
    let config = test_config();
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response("<answer>No search needed.</answer>"),
        text_response("never requested"),
    ]));
    let web = Arc::new(ScriptedWeb::new());
    let agent = agent(&config, provider.clone(), web.clone());

    let summary = agent.run_to_completion(&[Message::user("hi")]).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(summary.tool_calls_made, 0);
    assert_eq!(
        summary.messages.last().unwrap().text(),
        "<answer>No search needed.</answer>"
    );
    assert!(web.searched().is_empty());
}

#[tokio::test]
async fn e2e_budget_of_one_stops_a_model_that_always_searches() {
    let mut config = test_config();
    config.agent.max_llm_calls = 1;
    let provider = Arc::new(ScriptedProvider::new(vec![tool_response(
        "search",
        serde_json::json!({"query": "more results"}),
        "searching again",
    )]));
    let web = Arc::new(ScriptedWeb::new());
    let agent = agent(&config, provider.clone(), web.clone());

    let summary = agent.run_to_completion(&[Message::user("loop forever")]).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert!(summary.tool_calls_made <= 1);
    assert!(web.searched().len() <= 1);
    assert!(summary.budget_exhausted);
}

#[tokio::test]
async fn e2e_stream_ends_with_exactly_one_done() {
    let config = test_config();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("search", serde_json::json!({"query": "paris"}), "look it up"),
        text_response("<answer>ok</answer>"),
    ]));
    let agent = agent(&config, provider, Arc::new(ScriptedWeb::new()));

    let mut rx = agent.run(&[Message::user("paris?")]).unwrap();
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert!(matches!(events.last(), Some(AgentStreamEvent::Done { .. })));
    assert!(events.iter().any(|e| matches!(e, AgentStreamEvent::ToolCall { name, .. } if name == "search")));
    assert!(events.iter().any(|e| matches!(e, AgentStreamEvent::Snapshot { .. })));
}

#[tokio::test]
async fn e2e_secondary_agent_follows_up() {
    let mut config = test_config();
    config.agent.secondary_system_prompt = Some("Double-check the answer.".into());
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response("<answer>draft</answer>"),
        text_response("<answer>checked</answer>"),
    ]));
    let agent = agent(&config, provider.clone(), Arc::new(ScriptedWeb::new()));
    assert!(agent.has_secondary());

    let summary = agent.run_to_completion(&[Message::user("q")]).await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(summary.llm_calls, 2);
    assert_eq!(summary.answer().as_deref(), Some("checked"));
    assert_eq!(provider.requests()[1].messages[0].text(), "Double-check the answer.");
}

// ── Tools through the registry ───────────────────────────────────────────

#[tokio::test]
async fn e2e_search_string_and_single_array_send_identical_requests() {
    let config = test_config();
    let web = Arc::new(ScriptedWeb::new());
    let tools = registry(&config, web.clone());

    let from_string = tools
        .execute(&ToolCall::new("search", serde_json::json!({"query": "paris weather"})))
        .await
        .unwrap();
    let from_array = tools
        .execute(&ToolCall::new("search", serde_json::json!({"query": ["paris weather"]})))
        .await
        .unwrap();

    assert_eq!(from_string, from_array);
    let requests = web.search_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, requests[1].url);
    assert_eq!(requests[0].query, requests[1].query);
}

#[tokio::test]
async fn e2e_search_truncates_and_keeps_input_order() {
    let config = test_config();
    let web = Arc::new(
        ScriptedWeb::new()
            .with_delay("a", 60)
            .with_delay("b", 30),
    );
    let tools = registry(&config, web.clone());

    let output = tools
        .execute(&ToolCall::new(
            "search",
            serde_json::json!({"query": ["a", "b", "c", "d", "e"]}),
        ))
        .await
        .unwrap();

    let mut searched = web.searched();
    searched.sort();
    assert_eq!(searched, vec!["a", "b", "c"]);

    let sections: Vec<&str> = output.split(SEPARATOR).collect();
    assert_eq!(sections.len(), 3);
    assert!(sections[0].starts_with("A web search for 'a'"));
    assert!(sections[1].starts_with("A web search for 'b'"));
    assert!(sections[2].starts_with("A web search for 'c'"));
}

#[tokio::test]
async fn e2e_visit_survives_one_unreachable_page() {
    let config = test_config();
    let web = Arc::new(ScriptedWeb::new());
    let tools = registry(&config, web.clone());

    let output = tools
        .execute(&ToolCall::new(
            "visit",
            serde_json::json!({
                "url": ["https://one.example", "https://unreachable.example", "https://two.example"],
                "goal": "paris weather"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(web.page_reads("https://unreachable.example"), 3);
    assert_eq!(web.page_reads("https://one.example"), 1);
    assert!(output.contains(
        "Failed to read content from https://unreachable.example. Please check the URL or try again later."
    ));
    assert!(output.contains("Content from https://one.example for goal 'paris weather':"));
    assert!(output.contains("Content from https://two.example for goal 'paris weather':"));
    assert!(output.contains("Paris weather: sunny, 18C"));
}

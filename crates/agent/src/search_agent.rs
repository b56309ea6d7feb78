//! The search agent: a streaming reason/act loop over web tools.
//!
//! One run:
//!
//! 1. **Prepare** a working copy of the caller's transcript: flatten bodies
//!    to text, date-stamp the first user message, add the instruction prefix
//!    and the system prompt.
//! 2. **Loop** while the run budget lasts: stream one model turn, forwarding
//!    snapshots; detect tool calls; dispatch them one at a time in order;
//!    append each result. A turn without tool calls ends the loop.
//! 3. **Hand off** (optional): a secondary agent takes the transcript minus
//!    its last entry, under its own system prompt, and runs again.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webseek_config::AppConfig;
use webseek_core::event::{DomainEvent, EventBus};
use webseek_core::message::{Content, Message, MessageToolCall, Role, Transcript};
use webseek_core::provider::{Provider, ProviderRequest};
use webseek_core::temporal::{Language, TemporalEnhancer};
use webseek_core::tool::{ToolCall, ToolKind, ToolRegistry};

use crate::budget::RunBudget;
use crate::detect::detect_tool_calls;
use crate::error::AgentError;
use crate::prompt::{REACT_USER_PROMPT, SystemPrompt, open_reasoning};
use crate::stream_event::AgentStreamEvent;

/// Source of "now" for date stamping.
pub type Clock = fn() -> DateTime<Utc>;

/// Stop generation where a text-protocol model would start inventing tool output.
const TOOL_RESPONSE_STOP: &str = "<tool_response>";

/// A web-information-seeking agent.
#[derive(Clone)]
pub struct SearchAgent {
    name: String,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    enhancer: TemporalEnhancer,
    language: Language,
    max_llm_calls: u32,
    reasoning: bool,
    custom_user_prompt: String,
    system_prompt: Option<SystemPrompt>,
    seed: Option<u64>,
    event_bus: Arc<EventBus>,
    secondary: Option<Arc<SearchAgent>>,
    clock: Clock,
}

/// The outcome of a drained run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Every message the run produced, in order
    pub messages: Vec<Message>,
    pub llm_calls: u32,
    pub tool_calls_made: u32,
    pub budget_exhausted: bool,
}

impl RunSummary {
    /// Text of the last assistant message.
    pub fn final_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.text())
    }

    /// The `<answer>` section of the final message, or the whole message.
    pub fn answer(&self) -> Option<String> {
        let text = self.final_text()?;
        let inner = text
            .split_once("<answer>")
            .map(|(_, rest)| rest.split("</answer>").next().unwrap_or(rest));
        Some(inner.unwrap_or(&text).trim().to_string())
    }
}

/// What one stage of the pipeline leaves behind.
struct StageOutcome {
    transcript: Transcript,
    response: Vec<Message>,
    llm_calls: u32,
    tool_calls: u32,
    budget_exhausted: bool,
}

/// Drop the trailing entry and swap the leading system message.
///
/// The last entry of a finished stage is an answer or an unterminated tool
/// result; the next stage starts without it.
pub fn handoff_transcript(transcript: &Transcript, system_prompt: Option<String>) -> Transcript {
    let trimmed = transcript.without_last();
    let leads_with_system = trimmed.first().is_some_and(|m| m.role == Role::System);
    match system_prompt {
        Some(prompt) if leads_with_system => {
            let mut messages = trimmed.into_messages();
            messages[0] = Message::system(prompt);
            Transcript::from(messages)
        }
        _ => trimmed,
    }
}

impl SearchAgent {
    /// Create a new search agent.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            name: "WebSeek".into(),
            provider,
            model: model.into(),
            temperature: 0.6,
            max_tokens: None,
            tools,
            enhancer: TemporalEnhancer::default(),
            language: Language::default(),
            max_llm_calls: 20,
            reasoning: true,
            custom_user_prompt: String::new(),
            system_prompt: None,
            seed: None,
            event_bus,
            secondary: None,
            clock: Utc::now,
        }
    }

    /// Build the agent described by the configuration.
    ///
    /// A `secondary_system_prompt` adds a follow-up agent with the same
    /// settings and that prompt.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let agent_cfg = &config.agent;
        let system_prompt = agent_cfg
            .system_prompt
            .clone()
            .map_or(SystemPrompt::WebSeeker, SystemPrompt::Fixed);
        let custom_user_prompt = agent_cfg
            .custom_user_prompt
            .clone()
            .unwrap_or_else(|| REACT_USER_PROMPT.to_string());

        let mut agent = Self::new(provider, &config.model, tools, event_bus)
            .with_name(&agent_cfg.name)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_max_llm_calls(agent_cfg.max_llm_calls)
            .with_reasoning(agent_cfg.reasoning)
            .with_language(agent_cfg.language)
            .with_enhancer(config.temporal.enhancer())
            .with_custom_user_prompt(custom_user_prompt)
            .with_system_prompt(system_prompt);
        if let Some(seed) = agent_cfg.seed {
            agent = agent.with_seed(seed);
        }

        match &agent_cfg.secondary_system_prompt {
            Some(prompt) => {
                let secondary = agent
                    .clone()
                    .with_name(format!("{}-followup", agent_cfg.name))
                    .with_system_prompt(SystemPrompt::Fixed(prompt.clone()));
                agent.with_secondary(secondary)
            }
            None => agent,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per model turn.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the run budget.
    pub fn with_max_llm_calls(mut self, max: u32) -> Self {
        self.max_llm_calls = max;
        self
    }

    pub fn with_reasoning(mut self, reasoning: bool) -> Self {
        self.reasoning = reasoning;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_enhancer(mut self, enhancer: TemporalEnhancer) -> Self {
        self.enhancer = enhancer;
        self
    }

    /// Instruction text put in front of the first user message.
    pub fn with_custom_user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_user_prompt = prompt.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: SystemPrompt) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Hand each finished run to `secondary` for a follow-up pass.
    pub fn with_secondary(mut self, secondary: SearchAgent) -> Self {
        self.secondary = Some(Arc::new(secondary));
        self
    }

    /// Replace the clock used for date stamping.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_llm_calls(&self) -> u32 {
        self.max_llm_calls
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// This agent's system prompt for a run starting now.
    pub fn make_system_prompt(&self) -> Option<String> {
        let today = self.enhancer.anchor_at((self.clock)()).format(self.enhancer.language());
        self.system_prompt
            .as_ref()
            .map(|prompt| prompt.render(&today, self.language))
    }

    fn enhance(&self, text: &str) -> String {
        self.enhancer.enhance_at(text, (self.clock)())
    }

    /// Build the working transcript for a run.
    ///
    /// The caller's messages are cloned, never modified. Fails if a message
    /// body has several parts.
    pub fn prepare(&self, history: &[Message]) -> Result<Transcript, AgentError> {
        let mut messages = Transcript::from_history(history).into_messages();

        for (index, message) in messages.iter_mut().enumerate() {
            let content = std::mem::take(&mut message.content);
            let text = content
                .into_single_text()
                .map_err(|parts| AgentError::ContractViolation { index, parts })?;
            message.content = Content::Text(text);
        }

        if let Some(first_user) = messages.iter_mut().find(|m| m.role == Role::User) {
            let original = first_user.text();
            let enhanced = self.enhance(&original);
            if enhanced != original {
                info!(agent = %self.name, original = %original, enhanced = %enhanced, "Enhanced time awareness");
            }
            let body = if self.custom_user_prompt.is_empty() || enhanced.starts_with(&self.custom_user_prompt) {
                enhanced
            } else {
                format!("{}{}", self.custom_user_prompt, enhanced)
            };
            first_user.content = Content::Text(body);
        }

        if let Some(prompt) = self.make_system_prompt()
            && messages.first().is_none_or(|m| m.role != Role::System)
        {
            messages.insert(0, Message::system(prompt));
        }

        for message in messages.iter_mut().filter(|m| m.role == Role::User) {
            let trimmed = message.text().trim().to_string();
            message.content = Content::Text(trimmed);
        }

        Ok(Transcript::from(messages))
    }

    /// Date-stamp a search call's `query`, string or array of strings.
    fn enhance_search_call(&self, call: &mut ToolCall) {
        if call.kind() != Some(ToolKind::Search) {
            return;
        }
        let Some(query) = call.arguments.get_mut("query") else {
            return;
        };

        let rewrite = |text: &mut String| {
            let enhanced = self.enhance(text);
            if enhanced != *text {
                info!(original = %text, enhanced = %enhanced, "Enhanced search query");
                self.event_bus.publish(DomainEvent::QueryEnhanced {
                    original: text.clone(),
                    enhanced: enhanced.clone(),
                    timestamp: Utc::now(),
                });
                *text = enhanced;
            }
        };

        match query {
            serde_json::Value::String(text) => rewrite(text),
            serde_json::Value::Array(items) => {
                for item in items.iter_mut() {
                    if let serde_json::Value::String(text) = item {
                        rewrite(text);
                    }
                }
            }
            _ => {}
        }
    }

    fn present(&self, text: &str) -> String {
        if self.reasoning && !text.trim().is_empty() {
            open_reasoning(text)
        } else {
            text.to_string()
        }
    }

    fn snapshot(prefix: &[Message], response: &[Message], partial: Option<&Message>) -> AgentStreamEvent {
        let mut messages = Vec::with_capacity(prefix.len() + response.len() + 1);
        messages.extend_from_slice(prefix);
        messages.extend_from_slice(response);
        messages.extend(partial.cloned());
        AgentStreamEvent::Snapshot { messages }
    }

    /// Stream one model turn, forwarding snapshots. Returns the final message.
    async fn model_turn(
        &self,
        transcript: &Transcript,
        prefix: &[Message],
        response: &[Message],
        tx: &mpsc::Sender<AgentStreamEvent>,
    ) -> Result<Option<Message>, AgentError> {
        let mut request = ProviderRequest::new(&self.model, transcript.messages().to_vec());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request.tools = self.tools.definitions();
        request.stream = true;
        request.stop = vec![TOOL_RESPONSE_STOP.to_string()];
        request.seed = self.seed;

        let mut stream_rx = self.provider.stream(request).await?;
        let mut content = String::new();
        let mut tool_calls: Vec<MessageToolCall> = Vec::new();

        while let Some(chunk) = stream_rx.recv().await {
            let chunk = chunk?;
            tool_calls.extend(chunk.tool_calls);
            if let Some(delta) = chunk.content
                && !delta.is_empty()
            {
                content.push_str(&delta);
                let partial = Message::assistant(self.present(&content));
                let _ = tx.send(Self::snapshot(prefix, response, Some(&partial))).await;
            }
        }

        if content.trim().is_empty() && tool_calls.is_empty() {
            return Ok(None);
        }

        let mut message = Message::assistant(self.present(&content));
        message.tool_calls = tool_calls;
        Ok(Some(message))
    }

    /// Run the reason/act loop over a prepared transcript.
    ///
    /// `prefix` is shown in front of every snapshot; the handoff stage uses
    /// it to keep the first stage's output visible.
    async fn run_loop(
        &self,
        mut transcript: Transcript,
        prefix: &[Message],
        tx: &mpsc::Sender<AgentStreamEvent>,
    ) -> Result<StageOutcome, AgentError> {
        let mut budget = RunBudget::new(self.max_llm_calls);
        let mut response: Vec<Message> = Vec::new();
        let mut tool_calls_made = 0u32;
        let mut budget_exhausted = false;

        info!(agent = %self.name, model = %self.model, budget = self.max_llm_calls, "Search run starting");

        loop {
            if !budget.try_spend() {
                warn!(agent = %self.name, "Run budget exhausted");
                budget_exhausted = true;
                break;
            }

            self.event_bus.publish(DomainEvent::LlmCalled {
                agent: self.name.clone(),
                model: self.model.clone(),
                call_index: budget.used(),
                timestamp: Utc::now(),
            });
            debug!(agent = %self.name, call = budget.used(), "Calling model");

            let Some(output) = self.model_turn(&transcript, prefix, &response, tx).await? else {
                info!(agent = %self.name, "Model returned an empty turn");
                break;
            };

            let intents = detect_tool_calls(&output);
            transcript.push(output.clone());
            response.push(output);

            if intents.is_empty() {
                info!(agent = %self.name, "No tool used, run complete");
                break;
            }

            for mut call in intents {
                self.enhance_search_call(&mut call);
                info!(agent = %self.name, tool = %call.name, arguments = %call.arguments, "Dispatching tool call");
                let _ = tx
                    .send(AgentStreamEvent::ToolCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    })
                    .await;

                let start = Instant::now();
                let result = self.tools.invoke(&call).await;
                tool_calls_made += 1;

                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: result.name.clone(),
                    output_chars: result.output.chars().count(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                });

                let message = Message::tool_result(result.name, result.call_id, result.output);
                transcript.push(message.clone());
                response.push(message);
                let _ = tx.send(Self::snapshot(prefix, &response, None)).await;
            }
        }

        self.event_bus.publish(DomainEvent::RunFinished {
            agent: self.name.clone(),
            llm_calls: budget.used(),
            tool_calls: tool_calls_made,
            budget_exhausted,
            timestamp: Utc::now(),
        });
        info!(
            agent = %self.name,
            llm_calls = budget.used(),
            tool_calls = tool_calls_made,
            budget_exhausted,
            "Search run finished"
        );

        Ok(StageOutcome {
            transcript,
            response,
            llm_calls: budget.used(),
            tool_calls: tool_calls_made,
            budget_exhausted,
        })
    }

    /// Primary stage, then the optional handoff stage.
    async fn pipeline(
        &self,
        transcript: Transcript,
        tx: &mpsc::Sender<AgentStreamEvent>,
    ) -> Result<RunSummary, AgentError> {
        let primary = self.run_loop(transcript, &[], tx).await?;
        let _ = tx.send(Self::snapshot(&[], &primary.response, None)).await;

        let Some(secondary) = &self.secondary else {
            return Ok(RunSummary {
                messages: primary.response,
                llm_calls: primary.llm_calls,
                tool_calls_made: primary.tool_calls,
                budget_exhausted: primary.budget_exhausted,
            });
        };

        info!(from = %self.name, to = %secondary.name, "Handing transcript to secondary agent");
        let handoff = handoff_transcript(&primary.transcript, secondary.make_system_prompt());
        let mut prefix = primary.response;
        prefix.pop();

        let transcript = secondary.prepare(handoff.messages())?;
        let follow_up = secondary.run_loop(transcript, &prefix, tx).await?;

        let mut messages = prefix;
        messages.extend(follow_up.response);
        Ok(RunSummary {
            messages,
            llm_calls: primary.llm_calls + follow_up.llm_calls,
            tool_calls_made: primary.tool_calls + follow_up.tool_calls,
            budget_exhausted: follow_up.budget_exhausted,
        })
    }

    /// Start a run over `history`.
    ///
    /// Returns a receiver of snapshots closed by one `Done` or `Error`
    /// event. The run executes on a background task. A malformed history
    /// is rejected before anything starts.
    pub fn run(&self, history: &[Message]) -> Result<mpsc::Receiver<AgentStreamEvent>, AgentError> {
        let transcript = self.prepare(history)?;
        let (tx, rx) = mpsc::channel::<AgentStreamEvent>(128);
        let agent = self.clone();

        tokio::spawn(async move {
            let event = match agent.pipeline(transcript, &tx).await {
                Ok(summary) => AgentStreamEvent::Done {
                    messages: summary.messages,
                    llm_calls: summary.llm_calls,
                    tool_calls_made: summary.tool_calls_made,
                    budget_exhausted: summary.budget_exhausted,
                },
                Err(e) => {
                    warn!(agent = %agent.name, error = %e, "Search run failed");
                    AgentStreamEvent::Error { message: e.to_string() }
                }
            };
            let _ = tx.send(event).await;
        });

        Ok(rx)
    }

    /// Run to the end and return the final response.
    pub async fn run_to_completion(&self, history: &[Message]) -> Result<RunSummary, AgentError> {
        let mut rx = self.run(history)?;
        while let Some(event) = rx.recv().await {
            match event {
                AgentStreamEvent::Done {
                    messages,
                    llm_calls,
                    tool_calls_made,
                    budget_exhausted,
                } => {
                    return Ok(RunSummary {
                        messages,
                        llm_calls,
                        tool_calls_made,
                        budget_exhausted,
                    });
                }
                AgentStreamEvent::Error { message } => return Err(AgentError::Stream(message)),
                AgentStreamEvent::Snapshot { .. } | AgentStreamEvent::ToolCall { .. } => {}
            }
        }
        Err(AgentError::Stream("run ended without a final response".into()))
    }
}

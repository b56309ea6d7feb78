//! `webseek agent`: Interactive or single-message mode.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use webseek_agent::{AgentStreamEvent, SearchAgent, trim_history};
use webseek_config::AppConfig;
use webseek_core::event::EventBus;
use webseek_core::message::{Message, Role};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  WARNING: No completion-service API key configured.");
        eprintln!("  Set WEBSEEK_API_KEY (or OPENAI_API_KEY), or add api_key to");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!("  Continuing without a key (fine for local endpoints).");
        eprintln!();
    }
    if !config.search.has_credentials() {
        eprintln!("  Note: search credentials are missing; the search tool will report an error.");
    }

    let router = webseek_providers::build_from_config(&config);
    let provider = router.default().ok_or("No completion service configured")?;
    let tools = Arc::new(webseek_tools::build_registry(&config, router.summarizer()));
    let event_bus = Arc::new(EventBus::default());
    let agent = SearchAgent::from_config(&config, provider, tools, event_bus);

    if let Some(msg) = message {
        eprint!("  Searching...");
        let summary = agent.run_to_completion(&[Message::user(msg)]).await;
        eprint!("\r               \r");
        let summary = summary?;
        println!("{}", summary.answer().unwrap_or_default());
        if summary.budget_exhausted {
            eprintln!("  (stopped after {} model calls)", summary.llm_calls);
        }
        return Ok(());
    }

    println!();
    println!("  WebSeek — Interactive Mode");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Tools:     search, visit");
    println!("  Budget:    {} model calls per question", agent.max_llm_calls());
    if agent.has_secondary() {
        println!("  Follow-up: enabled");
    }
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<Message> = Vec::new();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        history.push(Message::user(line));
        match stream_answer(&agent, &history).await {
            Ok(response) => history.extend(response),
            Err(e) => {
                eprintln!("  [Error] {e}");
                history.pop();
            }
        }
        history = trim_history(&history, config.agent.history_limit);
        println!();
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// Run one question, echoing the response as it grows.
async fn stream_answer(
    agent: &SearchAgent,
    history: &[Message],
) -> Result<Vec<Message>, Box<dyn std::error::Error>> {
    let mut rx = agent.run(history)?;
    let mut printer = SnapshotPrinter::default();
    let mut out = std::io::stdout();

    println!();
    while let Some(event) = rx.recv().await {
        match event {
            AgentStreamEvent::Snapshot { messages } => {
                write!(out, "{}", printer.advance(&messages))?;
                out.flush()?;
            }
            AgentStreamEvent::ToolCall { name, arguments } => {
                tracing::debug!(tool = %name, arguments = %arguments, "Tool call");
            }
            AgentStreamEvent::Done { messages, budget_exhausted, llm_calls, .. } => {
                write!(out, "{}", printer.advance(&messages))?;
                writeln!(out)?;
                if budget_exhausted {
                    eprintln!("  (stopped after {llm_calls} model calls)");
                }
                return Ok(messages);
            }
            AgentStreamEvent::Error { message } => return Err(message.into()),
        }
    }
    Err("run ended without a final response".into())
}

/// Turns successive snapshots into the text not yet printed.
#[derive(Default)]
struct SnapshotPrinter {
    printed: String,
}

impl SnapshotPrinter {
    fn render(messages: &[Message]) -> String {
        messages
            .iter()
            .map(|m| match m.role {
                Role::Tool => format!(
                    "[{}]\n{}",
                    m.name.as_deref().unwrap_or("tool"),
                    m.text()
                ),
                _ => m.text(),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The new suffix, or the whole rendering on a fresh line when the
    /// snapshot no longer extends what was printed.
    fn advance(&mut self, messages: &[Message]) -> String {
        let rendered = Self::render(messages);
        let delta = match rendered.strip_prefix(self.printed.as_str()) {
            Some(rest) => rest.to_string(),
            None => format!("\n{rendered}"),
        };
        self.printed = rendered;
        delta
    }
}

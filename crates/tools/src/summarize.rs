//! Page summarizers: turn a fetched page and a goal into goal-relevant text.
//!
//! Two strategies share the [`PageSummarizer`] capability:
//! - [`LlmSummarizer`] asks a completion service for a structured extract.
//! - [`TextSummarizer`] strips markup and keeps lines mentioning the goal.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex_lite::Regex;
use tracing::{debug, warn};
use webseek_core::error::ToolError;
use webseek_core::message::Message;
use webseek_core::provider::{Provider, ProviderRequest};

use crate::reader::{PageFetch, PageReader};

const EXTRACTOR_PROMPT: &str = r#"Please process the following webpage content and user goal to extract relevant information:

## **Webpage Content**
{webpage_content}

## **User Goal**
{goal}

## **Task Guidelines**
1. **Content Scanning**: Locate the **specific sections/data** directly related to the user's goal within the webpage content.
2. **Key Extraction**: Identify and extract the **most relevant information** from the content, you never miss any important information
3. **Summary Output**: Organize into a concise paragraph with logical flow, prioritizing clarity and judge the contribution of the information to the goal.

**Final Output Format using JSON format**:
{
  "rational": "string",
  "evidence": "string",
  "summary": "string",
}
"#;

const MISSING_EVIDENCE: &str = "The provided webpage content is not in json.";
const MISSING_SUMMARY: &str = "The webpage content is not processed in json";
const UNAVAILABLE_EVIDENCE: &str =
    "The provided webpage content could not be accessed. Please check the URL or file format.";
const UNAVAILABLE_SUMMARY: &str =
    "The webpage content could not be processed, and therefore, no information is available.";

/// Characters of raw page text kept when extraction fails.
const EXCERPT_CHARS: usize = 1000;
/// Cleaned text longer than this is cut before keyword filtering.
const MAX_CLEAN_CHARS: usize = 2000;
/// Matching lines kept by the text summarizer.
const MAX_MATCHING_LINES: usize = 10;

static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

/// Turns a URL and a goal into goal-relevant text.
///
/// Fetch and extraction problems are reported in the returned text; `Err`
/// is reserved for failures the caller labels with the URL.
#[async_trait]
pub trait PageSummarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, url: &str, goal: &str) -> Result<String, ToolError>;
}

/// First `n` characters of `text`.
pub(crate) fn truncate_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn evidence_block(url: &str, goal: &str, evidence: &str, summary: &str) -> String {
    format!(
        "The useful information in {url} for user goal {goal} as follows: \n\nEvidence in page: \n{evidence}\n\nSummary: \n{summary}\n\n"
    )
}

fn excerpt_block(url: &str, goal: &str, content: &str) -> String {
    format!(
        "Content from {url} for goal '{goal}':\n\n{}...",
        truncate_chars(content, EXCERPT_CHARS)
    )
}

/// Remove a markdown code fence around a JSON reply.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn field_text(extract: &serde_json::Map<String, serde_json::Value>, key: &str, fallback: &str) -> String {
    match extract.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Model-based extraction: fetch, then ask for `{rational, evidence, summary}`.
pub struct LlmSummarizer {
    reader: Arc<PageReader>,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_attempts: u32,
}

impl LlmSummarizer {
    pub fn new(reader: Arc<PageReader>, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            reader,
            provider,
            model: model.into(),
            temperature: 0.1,
            max_tokens: 2000,
            max_attempts: 3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Ask the completion service for the structured extract.
    async fn extract(&self, content: &str, goal: &str) -> Result<String, String> {
        let prompt = EXTRACTOR_PROMPT
            .replace("{webpage_content}", content)
            .replace("{goal}", goal);

        let mut request = ProviderRequest::new(&self.model, vec![Message::user(prompt)]);
        request.temperature = self.temperature;
        request.max_tokens = Some(self.max_tokens);
        request.json_output = true;

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| format!("summarization request failed: {e}"))?;
        Ok(response.message.text())
    }

    fn parse(raw: &str) -> Result<(String, String), String> {
        let value: serde_json::Value =
            serde_json::from_str(strip_fences(raw)).map_err(|e| e.to_string())?;
        let extract = value
            .as_object()
            .ok_or_else(|| "extract is not a JSON object".to_string())?;
        Ok((
            field_text(extract, "evidence", MISSING_EVIDENCE),
            field_text(extract, "summary", MISSING_SUMMARY),
        ))
    }
}

#[async_trait]
impl PageSummarizer for LlmSummarizer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn summarize(&self, url: &str, goal: &str) -> Result<String, ToolError> {
        for attempt in 1..=self.max_attempts {
            let content = match self.reader.read(url).await {
                PageFetch::Fetched(content) => content,
                // The reader has already spent its own retries.
                PageFetch::Failed => break,
            };

            let parsed = self
                .extract(&content, goal)
                .await
                .and_then(|raw| Self::parse(&raw));
            match parsed {
                Ok((evidence, summary)) => {
                    debug!(url, attempt, "Page extract parsed");
                    return Ok(evidence_block(url, goal, &evidence, &summary));
                }
                Err(reason) => {
                    warn!(url, attempt, %reason, "Failed to parse page extract");
                    if attempt == self.max_attempts {
                        return Ok(excerpt_block(url, goal, &content));
                    }
                }
            }
        }

        Ok(evidence_block(url, goal, UNAVAILABLE_EVIDENCE, UNAVAILABLE_SUMMARY))
    }
}

/// Text-only extraction: strip tags and keep lines that mention the goal.
pub struct TextSummarizer {
    reader: Arc<PageReader>,
}

impl TextSummarizer {
    pub fn new(reader: Arc<PageReader>) -> Self {
        Self { reader }
    }

    /// Clean `content` and filter it by the goal's keywords.
    pub fn condense(content: &str, goal: &str) -> String {
        let stripped = match TAG.as_ref() {
            Some(tag) => tag.replace_all(content, ""),
            None => content.into(),
        };
        let cleaned = stripped
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let cleaned = if cleaned.chars().count() > MAX_CLEAN_CHARS {
            format!("{}...", truncate_chars(&cleaned, MAX_CLEAN_CHARS))
        } else {
            cleaned
        };

        let goal = goal.to_lowercase();
        let keywords: Vec<&str> = goal.split_whitespace().collect();
        let relevant: Vec<&str> = cleaned
            .lines()
            .filter(|line| {
                let line = line.to_lowercase();
                keywords.iter().any(|k| line.contains(k))
            })
            .take(MAX_MATCHING_LINES)
            .collect();

        if relevant.is_empty() {
            truncate_chars(&cleaned, EXCERPT_CHARS).to_string()
        } else {
            relevant.join("\n")
        }
    }
}

#[async_trait]
impl PageSummarizer for TextSummarizer {
    fn name(&self) -> &str {
        "text"
    }

    async fn summarize(&self, url: &str, goal: &str) -> Result<String, ToolError> {
        match self.reader.read(url).await {
            PageFetch::Fetched(content) => Ok(format!(
                "Content from {url} for goal '{goal}':\n\n{}",
                Self::condense(&content, goal)
            )),
            PageFetch::Failed => Ok(format!(
                "Failed to read content from {url}. Please check the URL or try again later."
            )),
        }
    }
}

//! Page visit tool: fetch one or more URLs and summarize them for a goal.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};
use webseek_core::error::ToolError;
use webseek_core::tool::{Tool, ToolKind};

use crate::SEPARATOR;
use crate::summarize::PageSummarizer;

const INVALID_REQUEST: &str = "[Visit] Invalid request format: Input must be a JSON object containing 'url' and 'goal' fields";

/// Parsed visit arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRequest {
    pub urls: Vec<String>,
    pub goal: String,
    /// The model passed a list rather than a single URL
    pub batch: bool,
}

impl VisitRequest {
    /// Accepts `{"url": "..." | [...], "goal": "..."}`, directly or JSON-encoded.
    pub fn parse(arguments: &serde_json::Value) -> Result<Self, ToolError> {
        let invalid = || ToolError::InvalidArguments(INVALID_REQUEST.into());

        let decoded;
        let arguments = match arguments {
            serde_json::Value::String(raw) => {
                decoded = serde_json::from_str::<serde_json::Value>(raw).map_err(|_| invalid())?;
                &decoded
            }
            other => other,
        };

        let object = arguments.as_object().ok_or_else(invalid)?;
        let goal = object
            .get("goal")
            .and_then(|g| g.as_str())
            .ok_or_else(invalid)?
            .to_string();

        let (urls, batch) = match object.get("url") {
            Some(serde_json::Value::String(url)) => (vec![url.clone()], false),
            Some(serde_json::Value::Array(items)) if !items.is_empty() => {
                let urls = items
                    .iter()
                    .map(|u| u.as_str().map(str::to_string).ok_or_else(invalid))
                    .collect::<Result<Vec<_>, _>>()?;
                (urls, true)
            }
            _ => return Err(invalid()),
        };

        Ok(Self { urls, goal, batch })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "summarizer panicked".to_string()
    }
}

/// Visits pages and returns goal-focused summaries.
pub struct VisitTool {
    summarizer: Arc<dyn PageSummarizer>,
    workers: usize,
}

impl VisitTool {
    pub fn new(summarizer: Arc<dyn PageSummarizer>, workers: usize) -> Self {
        Self {
            summarizer,
            workers: workers.max(1),
        }
    }

    pub fn summarizer_name(&self) -> &str {
        self.summarizer.name()
    }

    async fn visit_one(&self, url: &str, goal: &str) -> String {
        match self.summarizer.summarize(url, goal).await {
            Ok(text) => text,
            Err(e) => format!("Error fetching {url}: {e}"),
        }
    }

    /// Visit every URL on the worker pool; results arrive in completion order.
    async fn visit_many(&self, urls: Vec<String>, goal: &str) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut join_set = JoinSet::new();

        for url in urls {
            let summarizer = Arc::clone(&self.summarizer);
            let semaphore = Arc::clone(&semaphore);
            let goal = goal.to_string();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = AssertUnwindSafe(summarizer.summarize(&url, &goal))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(text)) => text,
                    Ok(Err(e)) => format!("Error fetching {url}: {e}"),
                    Err(payload) => format!("Error fetching {url}: {}", panic_message(payload.as_ref())),
                }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(text) => results.push(text),
                Err(e) => error!(error = %e, "Visit worker did not complete"),
            }
        }
        results
    }
}

#[async_trait]
impl Tool for VisitTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Visit
    }

    fn description(&self) -> &str {
        "Visit webpage(s) and return the summary of the content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" }, "minItems": 1 }
                    ],
                    "description": "The URL(s) of the webpage(s) to visit. Can be a single URL or an array of URLs."
                },
                "goal": {
                    "type": "string",
                    "description": "The goal of the visit for webpage(s)."
                }
            },
            "required": ["url", "goal"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let request = VisitRequest::parse(&arguments)?;
        debug!(
            urls = request.urls.len(),
            summarizer = self.summarizer.name(),
            "Visiting pages"
        );

        let output = if request.batch {
            self.visit_many(request.urls, &request.goal)
                .await
                .join(SEPARATOR)
        } else {
            self.visit_one(&request.urls[0], &request.goal).await
        };

        Ok(output.trim().to_string())
    }
}

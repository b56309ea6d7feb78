//! Web search tool: batched Google Custom Search queries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};
use webseek_config::SearchConfig;
use webseek_core::error::ToolError;
use webseek_core::tool::{Tool, ToolKind};

use crate::SEPARATOR;
use crate::http::{HttpClient, HttpRequest};

const MISSING_CREDENTIALS: &str = "[Search] Please set both GOOGLE_SEARCH_KEY and GOOGLE_CSE_ID environment variables for Google Custom Search API.";

/// Searches the web for one query or a batch of queries.
pub struct SearchTool {
    http: Arc<dyn HttpClient>,
    config: SearchConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

impl SearchTool {
    pub fn new(http: Arc<dyn HttpClient>, config: SearchConfig) -> Self {
        Self { http, config }
    }

    /// Normalize the arguments into a list of queries.
    ///
    /// Accepts `{"query": "..."}`, `{"query": [...]}`, the same object encoded
    /// as a JSON string, or a bare string used as the query itself.
    pub fn parse_queries(arguments: &serde_json::Value) -> Result<Vec<String>, ToolError> {
        let owned;
        let object = match arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::String(raw) => {
                match serde_json::from_str::<serde_json::Value>(raw) {
                    Ok(serde_json::Value::Object(map)) => {
                        owned = map;
                        &owned
                    }
                    _ => return Ok(vec![raw.clone()]),
                }
            }
            _ => return Err(ToolError::InvalidArguments("[Search] Invalid parameter format".into())),
        };

        let query = object.get("query").ok_or_else(|| {
            ToolError::InvalidArguments("[Search] Missing 'query' field in parameters".into())
        })?;

        let invalid = || ToolError::InvalidArguments("[Search] Query must be a string or array of strings".into());
        match query {
            serde_json::Value::String(q) => Ok(vec![q.clone()]),
            serde_json::Value::Array(items) => {
                let queries = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                    .collect::<Result<Vec<_>, _>>()?;
                if queries.is_empty() {
                    return Err(ToolError::InvalidArguments(
                        "[Search] Query array must not be empty".into(),
                    ));
                }
                Ok(queries)
            }
            _ => Err(invalid()),
        }
    }

    fn request_for(&self, query: &str) -> Option<HttpRequest> {
        let key = self.config.api_key.as_deref()?;
        let cx = self.config.engine_id.as_deref()?;
        Some(
            HttpRequest::get(&self.config.endpoint)
                .query("key", key)
                .query("cx", cx)
                .query("q", query)
                .query("gl", &self.config.region)
                .query("num", self.config.num_results.to_string())
                .timeout(Duration::from_secs(self.config.timeout_secs)),
        )
    }

    /// Run one query. Never fails: problems are reported in the returned text.
    async fn search_one(&self, query: &str) -> String {
        let Some(request) = self.request_for(query) else {
            return MISSING_CREDENTIALS.to_string();
        };

        let response = match self.http.get(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(query, error = %e, "Search request failed");
                return format!("Search error: {e}");
            }
        };

        if !response.is_ok() {
            warn!(query, status = response.status, "Search provider returned an error status");
            return format!(
                "No results found for query: '{query}'. The search provider returned HTTP {}.",
                response.status
            );
        }

        let parsed: SearchResponse = match serde_json::from_str(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => return format!("Search error: invalid response for '{query}': {e}"),
        };

        match parsed.items.filter(|items| !items.is_empty()) {
            Some(items) => format_results(query, &items),
            None => format!("No results found for query: '{query}'. Try a more general query."),
        }
    }
}

fn format_results(query: &str, items: &[SearchItem]) -> String {
    let snippets: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. [{}]({})\n{}",
                i + 1,
                item.title.as_deref().unwrap_or("No title"),
                item.link.as_deref().unwrap_or("#"),
                item.snippet.as_deref().unwrap_or("No description"),
            )
        })
        .collect();

    format!(
        "A web search for '{query}' found {} results:\n\n## Web Results\n{}",
        snippets.len(),
        snippets.join("\n\n")
    )
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    fn description(&self) -> &str {
        "Performs batched web searches: supply an array 'query'; the tool retrieves the top 10 results for each query in one call."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" }, "minItems": 1 }
                    ],
                    "description": "A query or array of query strings. Include multiple complementary search queries in a single call."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        if !self.config.has_credentials() {
            return Err(ToolError::NotConfigured(MISSING_CREDENTIALS.into()));
        }

        let mut queries = Self::parse_queries(&arguments)?;

        if queries.len() > self.config.max_queries {
            debug!(
                requested = queries.len(),
                max = self.config.max_queries,
                "Truncating search batch"
            );
            queries.truncate(self.config.max_queries);
        }

        if let [query] = queries.as_slice() {
            return Ok(self.search_one(query).await);
        }

        let searches: Vec<_> = queries.iter().map(|query| self.search_one(query)).collect();
        let results: Vec<String> = stream::iter(searches)
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        Ok(results.join(SEPARATOR))
    }
}

//! Web tools for WebSeek.
//!
//! The agent can do two things in the world: search the web and visit
//! pages. Both accept either a single item or a batch, fan the batch out
//! over a small worker pool, and always answer with text.

pub mod http;
pub mod reader;
pub mod search;
pub mod summarize;
pub mod visit;

use std::sync::Arc;

use webseek_config::AppConfig;
use webseek_core::provider::Provider;
use webseek_core::tool::ToolRegistry;

pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
pub use reader::{FETCH_FAILED, PageFetch, PageReader};
pub use search::SearchTool;
pub use summarize::{LlmSummarizer, PageSummarizer, TextSummarizer};
pub use visit::{VisitRequest, VisitTool};

/// Joins the per-item outputs of a batched tool call.
pub const SEPARATOR: &str = "\n=======\n";

/// Pick the page summarizer for the configuration.
///
/// The model-based summarizer is used when a summarization provider is
/// available; otherwise pages are condensed with the text-only strategy.
pub fn build_summarizer(
    config: &AppConfig,
    reader: Arc<PageReader>,
    provider: Option<Arc<dyn Provider>>,
) -> Arc<dyn PageSummarizer> {
    match provider {
        Some(provider) => Arc::new(
            LlmSummarizer::new(reader, provider, &config.summarizer.model)
                .with_temperature(config.summarizer.temperature)
                .with_max_tokens(config.summarizer.max_tokens)
                .with_max_attempts(config.summarizer.max_attempts),
        ),
        None => Arc::new(TextSummarizer::new(reader)),
    }
}

/// Create the registry with both tools sharing one HTTP client.
pub fn build_registry_with(
    config: &AppConfig,
    http: Arc<dyn HttpClient>,
    summarizer_provider: Option<Arc<dyn Provider>>,
) -> ToolRegistry {
    let reader = Arc::new(PageReader::new(Arc::clone(&http), config.reader.clone()));
    let summarizer = build_summarizer(config, reader, summarizer_provider);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchTool::new(http, config.search.clone())));
    registry.register(Box::new(VisitTool::new(summarizer, config.search.max_queries)));
    registry
}

/// Create the registry backed by real HTTP.
pub fn build_registry(config: &AppConfig, summarizer_provider: Option<Arc<dyn Provider>>) -> ToolRegistry {
    build_registry_with(config, Arc::new(ReqwestClient::new()), summarizer_provider)
}

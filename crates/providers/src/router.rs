//! Provider router: holds the completion services a run needs.
//!
//! The agent talks to the main model; the Visit tool's model-based
//! summarizer may talk to a different model behind a different endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use webseek_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;

/// Name under which the main completion service is registered.
pub const AGENT: &str = "agent";

/// Name under which the page summarization service is registered.
pub const SUMMARIZER: &str = "summarizer";

/// Routes completion requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The summarization service, if one is configured.
    pub fn summarizer(&self) -> Option<Arc<dyn Provider>> {
        self.get(SUMMARIZER)
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// The agent provider is always registered (an empty key is allowed for
/// local endpoints). The summarizer is registered only when enabled and a
/// key is available for it.
pub fn build_from_config(config: &webseek_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(AGENT);

    let api_key = config.api_key.clone().unwrap_or_default();
    router.register(
        AGENT,
        Arc::new(OpenAiCompatProvider::new(AGENT, &config.api_url, api_key)),
    );

    if config.uses_model_summarizer() {
        let key = config.summarizer_api_key().unwrap_or_default();
        router.register(
            SUMMARIZER,
            Arc::new(OpenAiCompatProvider::new(
                SUMMARIZER,
                config.summarizer_api_url(),
                key,
            )),
        );
    }

    router
}

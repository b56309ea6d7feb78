//! Configuration loading, validation, and management for WebSeek.
//!
//! Loads configuration from `~/.webseek/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use webseek_core::Language;

/// The root configuration structure.
///
/// Maps directly to `~/.webseek/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible completion service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model served by the completion service
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Orchestrator settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Search provider settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Page-reader service settings
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Model-based page summarization settings
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Relative-date rewriting settings
    #[serde(default)]
    pub temporal: TemporalConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "web-dancer".into()
}
fn default_temperature() -> f32 {
    0.6
}
fn default_max_tokens() -> u32 {
    10000
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_fan_out() -> usize {
    3
}
fn default_attempts() -> u32 {
    3
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("search", &self.search)
            .field("reader", &self.reader)
            .field("summarizer", &self.summarizer)
            .field("temporal", &self.temporal)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Model invocations allowed per run
    #[serde(default = "default_max_llm_calls")]
    pub max_llm_calls: u32,

    /// Prefix the first streamed message with an opening `<think>` marker
    #[serde(default = "default_true")]
    pub reasoning: bool,

    /// Answer language named in the built-in system prompt
    #[serde(default)]
    pub language: Language,

    /// Instruction prefix for the first user message. `None` uses the
    /// built-in ReAct tag protocol; an empty string disables the prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_user_prompt: Option<String>,

    /// Replaces the built-in system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// When set, a secondary agent with this system prompt takes a
    /// follow-up pass over each finished run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_system_prompt: Option<String>,

    /// Messages kept between turns in interactive sessions
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_agent_name() -> String {
    "WebSeek".into()
}
fn default_max_llm_calls() -> u32 {
    20
}
fn default_history_limit() -> usize {
    4
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_llm_calls: default_max_llm_calls(),
            reasoning: true,
            language: Language::default(),
            custom_user_prompt: None,
            system_prompt: None,
            secondary_system_prompt: None,
            history_limit: default_history_limit(),
            seed: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom search engine ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<String>,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Region hint sent with every query
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_num_results")]
    pub num_results: u32,

    /// Maximum queries per search call; also the page-visit worker count
    #[serde(default = "default_fan_out")]
    pub max_queries: usize,

    /// Concurrent provider requests per tool call
    #[serde(default = "default_fan_out")]
    pub workers: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_region() -> String {
    "cn".into()
}
fn default_num_results() -> u32 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            endpoint: default_search_endpoint(),
            region: default_region(),
            num_results: default_num_results(),
            max_queries: default_fan_out(),
            workers: default_fan_out(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SearchConfig {
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.engine_id.is_some()
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("engine_id", &self.engine_id)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("num_results", &self.num_results)
            .field("max_queries", &self.max_queries)
            .field("workers", &self.workers)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Bearer token for the reader service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// The target URL is appended to this prefix
    #[serde(default = "default_reader_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_reader_endpoint() -> String {
    "https://r.jina.ai/".into()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_reader_endpoint(),
            max_attempts: default_attempts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("max_attempts", &self.max_attempts)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Use the model-based summarizer when a key is available
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Falls back to the root `api_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Falls back to the root `api_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_summarizer_model")]
    pub model: String,

    #[serde(default = "default_summarizer_temperature")]
    pub temperature: f32,

    #[serde(default = "default_summarizer_max_tokens")]
    pub max_tokens: u32,

    /// Fetch-and-extract attempts per URL
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
}

fn default_summarizer_model() -> String {
    "gpt-4o-mini".into()
}
fn default_summarizer_temperature() -> f32 {
    0.1
}
fn default_summarizer_max_tokens() -> u32 {
    2000
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_url: None,
            model: default_summarizer_model(),
            temperature: default_summarizer_temperature(),
            max_tokens: default_summarizer_max_tokens(),
            max_attempts: default_attempts(),
        }
    }
}

impl std::fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Fixed offset used to resolve "now"
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Language of rendered dates
    #[serde(default)]
    pub language: Language,
}

fn default_utc_offset_hours() -> i32 {
    webseek_core::temporal::DEFAULT_UTC_OFFSET_HOURS
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            language: Language::default(),
        }
    }
}

impl TemporalConfig {
    pub fn enhancer(&self) -> webseek_core::TemporalEnhancer {
        webseek_core::TemporalEnhancer::new(self.utc_offset_hours, self.language)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.webseek/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Credentials from the environment only fill gaps left by the file;
    /// tuning knobs (model, base URL, call budget, fan-out) always win.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = non_empty("WEBSEEK_API_KEY").or_else(|| non_empty("OPENAI_API_KEY"));
        }
        if let Some(url) = non_empty("OPENAI_API_BASE") {
            self.api_url = url;
        }
        if let Some(model) = non_empty("WEBSEEK_MODEL") {
            self.model = model;
        }
        if let Some(calls) = non_empty("WEBSEEK_MAX_LLM_CALLS").and_then(|v| v.trim().parse().ok()) {
            self.agent.max_llm_calls = calls;
        }

        if self.search.api_key.is_none() {
            self.search.api_key = non_empty("GOOGLE_SEARCH_KEY");
        }
        if self.search.engine_id.is_none() {
            self.search.engine_id = non_empty("GOOGLE_CSE_ID");
        }
        if let Some(n) = non_empty("MAX_MULTIQUERY_NUM").and_then(|v| v.trim().parse().ok()) {
            self.search.max_queries = n;
        }

        if self.reader.api_key.is_none() {
            self.reader.api_key = non_empty("JINA_API_KEY");
        }
        if self.summarizer.api_key.is_none() {
            self.summarizer.api_key = non_empty("SUMMARIZER_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".webseek")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.summarizer.temperature) {
            return Err(ConfigError::ValidationError(
                "summarizer.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_llm_calls == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_llm_calls must be > 0".into(),
            ));
        }
        if self.search.max_queries == 0 || self.search.workers == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_queries and search.workers must be > 0".into(),
            ));
        }
        if self.reader.max_attempts == 0 || self.summarizer.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "reader.max_attempts and summarizer.max_attempts must be > 0".into(),
            ));
        }
        if !(-12..=14).contains(&self.temporal.utc_offset_hours) {
            return Err(ConfigError::ValidationError(
                "temporal.utc_offset_hours must be between -12 and 14".into(),
            ));
        }
        Ok(())
    }

    /// Check if a completion-service API key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Key for the summarizer, falling back to the main key.
    pub fn summarizer_api_key(&self) -> Option<&str> {
        self.summarizer
            .api_key
            .as_deref()
            .or(self.api_key.as_deref())
    }

    /// Base URL for the summarizer, falling back to the main URL.
    pub fn summarizer_api_url(&self) -> &str {
        self.summarizer.api_url.as_deref().unwrap_or(&self.api_url)
    }

    /// Whether the Visit tool will summarize pages with a model.
    pub fn uses_model_summarizer(&self) -> bool {
        self.summarizer.enabled && self.summarizer_api_key().is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            search: SearchConfig::default(),
            reader: ReaderConfig::default(),
            summarizer: SummarizerConfig::default(),
            temporal: TemporalConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

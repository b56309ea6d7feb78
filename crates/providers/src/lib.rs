//! Completion service implementations for WebSeek.
//!
//! All providers implement the `webseek_core::Provider` trait.
//! The router holds the main and summarization services built from configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};

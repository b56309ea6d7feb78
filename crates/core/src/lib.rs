//! # WebSeek Core
//!
//! Domain types, traits, and error definitions for the WebSeek
//! web-information-seeking agent. This crate has **no I/O of its own**: it
//! defines the model that the provider, tool, and agent crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion service, tools) is a trait here.
//! Implementations live in their respective crates. This enables:
//! - Swapping the completion service or HTTP stack via configuration
//! - Easy testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod temporal;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Content, ContentPart, Message, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use temporal::{Language, TemporalAnchor, TemporalEnhancer};
pub use tool::{Tool, ToolCall, ToolKind, ToolRegistry, ToolResult};

//! Agent errors.

use webseek_core::error::ProviderError;

/// Failures that end a run.
///
/// Tool failures never show up here: the registry renders them as text for
/// the model.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A caller-supplied message has a multi-part body without exactly one part.
    #[error("Message {index} has {parts} content parts; exactly one is required")]
    ContractViolation { index: usize, parts: usize },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The run reported an error event or ended without a final response.
    #[error("Run failed: {0}")]
    Stream(String),
}

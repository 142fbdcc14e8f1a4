use async_trait::async_trait;

use crate::errors::CompletionError;
use crate::messages::ChatMessage;

/// Per-call knobs passed to the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: None,
        }
    }
}

impl CompletionOptions {
    pub fn with_max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            ..Self::default()
        }
    }
}

/// The one capability the pipeline needs from a model backend: turn an
/// ordered list of role-tagged messages into text, or fail.
///
/// Implementations must not retry on their own; retry policy is layered on
/// top by wrapping providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CompletionError>;
}

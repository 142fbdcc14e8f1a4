use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Clone, Debug, thiserror::Error)]
pub enum LookupError {
    #[error("template store unavailable: {0}")]
    Unavailable(String),
}

/// Per-owner saved prompts, consulted by template mode.
///
/// `Ok(None)` means "no such template for this owner"; an `Err` means the
/// store itself could not answer.
pub trait TemplateStore: Send + Sync {
    fn fetch_prompt(&self, template_id: i64, owner: &str) -> Result<Option<String>, LookupError>;
}

/// Map-backed store for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    prompts: RwLock<HashMap<(i64, String), String>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, template_id: i64, owner: impl Into<String>, prompt: impl Into<String>) {
        let _ = self
            .prompts
            .write()
            .insert((template_id, owner.into()), prompt.into());
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn fetch_prompt(&self, template_id: i64, owner: &str) -> Result<Option<String>, LookupError> {
        Ok(self
            .prompts
            .read()
            .get(&(template_id, owner.to_string()))
            .cloned())
    }
}

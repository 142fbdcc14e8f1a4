//! Interchangeable draft producers, one per generation mode.

mod ai_style;
mod custom;
mod template;

pub use ai_style::AiStyleStrategy;
pub use custom::CustomPromptStrategy;
pub use template::TemplateStrategy;

use std::sync::Arc;

use async_trait::async_trait;

use outreach_core::email::EmailDraft;
use outreach_core::messages::framed;
use outreach_core::prompt::PromptValues;
use outreach_core::provider::{CompletionOptions, CompletionProvider};
use outreach_core::store::TemplateStore;
use outreach_core::task::{GenerationMode, GenerationTask};

use crate::error::StrategyError;
use crate::reference::ReferenceMaterial;

/// Produces one draft for a task. Implementations own every decision that
/// depends on `mode_config`; callers only see the draft and the style
/// labels used for review.
#[async_trait]
pub trait GenerationStrategy: Send + Sync {
    fn mode(&self) -> GenerationMode;

    async fn generate(&self, task: &GenerationTask) -> Result<EmailDraft, StrategyError>;

    /// Style description handed to the evaluator.
    fn evaluation_style(&self, task: &GenerationTask) -> String;

    /// Style description handed to the refiner.
    fn refinement_style(&self, _task: &GenerationTask) -> String {
        "the original style".to_string()
    }
}

/// Dependencies every strategy shares.
#[derive(Clone)]
pub struct StrategyContext {
    pub provider: Arc<dyn CompletionProvider>,
    pub reference: Arc<ReferenceMaterial>,
    pub options: CompletionOptions,
}

impl StrategyContext {
    pub fn new(provider: Arc<dyn CompletionProvider>, reference: Arc<ReferenceMaterial>) -> Self {
        Self {
            provider,
            reference,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) async fn complete(&self, system: &str, prompt: String) -> Result<String, StrategyError> {
        let messages = framed(system, prompt);
        Ok(self.provider.complete(&messages, &self.options).await?)
    }
}

/// Values every mode can substitute.
pub(crate) fn task_values(task: &GenerationTask) -> PromptValues {
    PromptValues::new()
        .with("stakeholder_name", task.stakeholder.name.as_str())
        .with("stakeholder_title", task.stakeholder.title.as_str())
        .with("stakeholder_details", task.stakeholder.details.as_str())
        .with("company_name", task.company_name.as_str())
        .with("company_summary", task.company_summary.as_str())
        .with("relevant_context", task.relevant_context.as_str())
}

/// The three strategies, selected by mode.
pub struct StrategySet {
    ai_style: AiStyleStrategy,
    template: TemplateStrategy,
    custom: CustomPromptStrategy,
}

impl StrategySet {
    pub fn new(
        ctx: StrategyContext,
        default_style: &str,
        store: Option<Arc<dyn TemplateStore>>,
    ) -> Self {
        Self {
            ai_style: AiStyleStrategy::new(ctx.clone(), default_style),
            template: TemplateStrategy::new(ctx.clone(), store),
            custom: CustomPromptStrategy::new(ctx),
        }
    }

    pub fn select(&self, mode: GenerationMode) -> &dyn GenerationStrategy {
        match mode {
            GenerationMode::AiStyle => &self.ai_style,
            GenerationMode::Template => &self.template,
            GenerationMode::Custom => &self.custom,
        }
    }
}

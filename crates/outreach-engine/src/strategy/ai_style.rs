use async_trait::async_trait;
use tracing::{debug, instrument};

use outreach_core::email::EmailDraft;
use outreach_core::task::{GenerationMode, GenerationTask, ModeConfig};

use super::{task_values, GenerationStrategy, StrategyContext};
use crate::error::StrategyError;
use crate::prompts::styles::{self, Style};
use crate::prompts::system;
use crate::reference::PRODUCT_UNAVAILABLE;

const PRODUCT_BUDGET: usize = 4000;

/// Fills one of the fixed catalog styles.
pub struct AiStyleStrategy {
    ctx: StrategyContext,
    default_style: &'static Style,
}

impl AiStyleStrategy {
    pub fn new(ctx: StrategyContext, default_style: &str) -> Self {
        Self {
            ctx,
            default_style: styles::resolve(Some(default_style), styles::DEFAULT_STYLE_KEY),
        }
    }

    fn style_for(&self, task: &GenerationTask) -> &'static Style {
        match &task.mode_config {
            ModeConfig::AiStyle { style_key } => {
                styles::resolve(style_key.as_deref(), self.default_style.key)
            }
            _ => self.default_style,
        }
    }
}

#[async_trait]
impl GenerationStrategy for AiStyleStrategy {
    fn mode(&self) -> GenerationMode {
        GenerationMode::AiStyle
    }

    #[instrument(skip_all, fields(stakeholder = %task.stakeholder.name))]
    async fn generate(&self, task: &GenerationTask) -> Result<EmailDraft, StrategyError> {
        if !matches!(task.mode_config, ModeConfig::AiStyle { .. }) {
            return Err(StrategyError::ConfigMismatch {
                strategy: "ai_style",
                got: task.mode_config.mode().as_str(),
            });
        }
        let style = self.style_for(task);
        let reference = &self.ctx.reference;

        let product = match reference.product_excerpt(PRODUCT_BUDGET) {
            "" => PRODUCT_UNAVAILABLE,
            excerpt => excerpt,
        };
        let role = reference.role_context(&task.stakeholder.title);

        let mut values = task_values(task);
        values.set("product_report_excerpt", product);
        values.set("role_context_excerpt", role.text());

        let prompt = style.prompt.render(&values)?;
        debug!(style = style.key, chars = prompt.len(), "style prompt rendered");

        let raw = self.ctx.complete(system::AI_STYLE, prompt).await?;
        Ok(EmailDraft::from_model_output(&raw)?)
    }

    fn evaluation_style(&self, task: &GenerationTask) -> String {
        self.style_for(task).description.to_string()
    }

    fn refinement_style(&self, task: &GenerationTask) -> String {
        self.style_for(task).description.to_string()
    }
}

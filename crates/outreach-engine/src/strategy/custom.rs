use async_trait::async_trait;
use tracing::{instrument, warn};

use outreach_core::email::EmailDraft;
use outreach_core::task::{GenerationMode, GenerationTask, ModeConfig};

use super::{task_values, GenerationStrategy, StrategyContext};
use crate::error::StrategyError;
use crate::prompts::custom::{validate_instructions, CUSTOM_PROMPT, DEFAULT_INSTRUCTIONS};
use crate::prompts::system;
use crate::reference::prefix_chars;

const PRODUCT_BUDGET: usize = 3000;
const ROLE_BUDGET: usize = 1000;

/// Wraps caller instructions in the mandatory healthcare constraints.
pub struct CustomPromptStrategy {
    ctx: StrategyContext,
}

impl CustomPromptStrategy {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

/// Caller instructions, or the default when they fail validation.
pub fn effective_instructions(instructions: &str) -> &str {
    match validate_instructions(instructions) {
        Ok(()) => instructions.trim(),
        Err(e) => {
            warn!(error = %e, "custom instructions rejected, using default");
            DEFAULT_INSTRUCTIONS
        }
    }
}

#[async_trait]
impl GenerationStrategy for CustomPromptStrategy {
    fn mode(&self) -> GenerationMode {
        GenerationMode::Custom
    }

    #[instrument(skip_all, fields(stakeholder = %task.stakeholder.name))]
    async fn generate(&self, task: &GenerationTask) -> Result<EmailDraft, StrategyError> {
        let ModeConfig::Custom { instructions } = &task.mode_config else {
            return Err(StrategyError::ConfigMismatch {
                strategy: "custom",
                got: task.mode_config.mode().as_str(),
            });
        };

        let mut values = task_values(task);
        values.set("custom_instructions", effective_instructions(instructions));
        let base = CUSTOM_PROMPT.render(&values)?;

        let reference = &self.ctx.reference;
        let role = reference.role_context(&task.stakeholder.title).text();
        let prompt = format!(
            "{base}\n\n---\nIMPORTANT: Use language and facts from the Customer Report below. Consider the role context.\n\nCustomer Report:\n{}\n\nRole Context:\n{}\n---\n",
            reference.product_excerpt(PRODUCT_BUDGET),
            prefix_chars(&role, ROLE_BUDGET),
        );

        let raw = self.ctx.complete(system::CUSTOM, prompt).await?;
        Ok(EmailDraft::from_model_output(&raw)?)
    }

    fn evaluation_style(&self, _task: &GenerationTask) -> String {
        "custom user-defined style".to_string()
    }
}

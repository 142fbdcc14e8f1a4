use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use outreach_core::email::EmailDraft;
use outreach_core::json::{recover_json, JsonShape};
use outreach_core::prompt::substitute;
use outreach_core::store::{LookupError, TemplateStore};
use outreach_core::task::{GenerationMode, GenerationTask, ModeConfig, TemplateSource};

use super::{task_values, GenerationStrategy, StrategyContext};
use crate::error::StrategyError;
use crate::prompts::system;
use crate::prompts::templates::{self, AiSections, BuiltInTemplate};
use crate::reference::prefix_chars;

const PRODUCT_MULTIPLIER: usize = 5;
const PRODUCT_CAP: usize = 8000;
const ROLE_MULTIPLIER: usize = 2;
const ROLE_CAP: usize = 3000;

/// Reference budgets scale with the template's own length.
pub fn budgets(prompt: &str) -> (usize, usize) {
    let len = prompt.chars().count();
    (
        (len * PRODUCT_MULTIPLIER).min(PRODUCT_CAP),
        (len * ROLE_MULTIPLIER).min(ROLE_CAP),
    )
}

enum Resolved<'a> {
    /// Prompt asks for a complete `{subject, body}`.
    Complete(String),
    /// Prompt asks for AI slots that are then assembled.
    BuiltIn {
        template: &'static BuiltInTemplate,
        user_fields: &'a BTreeMap<String, String>,
    },
}

/// Template mode: inline prompt, stored prompt, or built-in skeleton.
pub struct TemplateStrategy {
    ctx: StrategyContext,
    store: Option<Arc<dyn TemplateStore>>,
}

impl TemplateStrategy {
    pub fn new(ctx: StrategyContext, store: Option<Arc<dyn TemplateStore>>) -> Self {
        Self { ctx, store }
    }

    fn resolve<'a>(&self, task: &'a GenerationTask) -> Result<Resolved<'a>, StrategyError> {
        let ModeConfig::Template(source) = &task.mode_config else {
            return Err(StrategyError::ConfigMismatch {
                strategy: "template",
                got: task.mode_config.mode().as_str(),
            });
        };
        match source {
            TemplateSource::RawPrompt { prompt, .. } => Ok(Resolved::Complete(prompt.clone())),
            TemplateSource::Stored { template_id, .. } => {
                let owner = task
                    .caller
                    .as_deref()
                    .ok_or(StrategyError::MissingCaller(*template_id))?;
                let store = self.store.as_ref().ok_or_else(|| {
                    LookupError::Unavailable("no template store configured".into())
                })?;
                match store.fetch_prompt(*template_id, owner)? {
                    Some(prompt) => Ok(Resolved::Complete(prompt)),
                    None => {
                        warn!(template_id, owner, "stored template not found");
                        Err(StrategyError::TemplateNotFound {
                            template_id: *template_id,
                            owner: owner.to_string(),
                        })
                    }
                }
            }
            TemplateSource::BuiltIn {
                template_key,
                user_fields,
            } => templates::template(template_key)
                .map(|template| Resolved::BuiltIn {
                    template,
                    user_fields,
                })
                .ok_or_else(|| StrategyError::UnknownTemplate(template_key.clone())),
        }
    }
}

#[async_trait]
impl GenerationStrategy for TemplateStrategy {
    fn mode(&self) -> GenerationMode {
        GenerationMode::Template
    }

    #[instrument(skip_all, fields(stakeholder = %task.stakeholder.name))]
    async fn generate(&self, task: &GenerationTask) -> Result<EmailDraft, StrategyError> {
        let resolved = self.resolve(task)?;
        let template_prompt = match &resolved {
            Resolved::Complete(prompt) => prompt.as_str(),
            Resolved::BuiltIn { template, .. } => template.prompt,
        };

        let mut values = task_values(task);
        values.set("stakeholder_first_name", task.stakeholder.first_name());
        if let ModeConfig::Template(source) = &task.mode_config {
            for (name, value) in source.user_fields() {
                values.set(name.as_str(), value.as_str());
            }
        }

        let (product_budget, role_budget) = budgets(template_prompt);
        let reference = &self.ctx.reference;
        let role = reference.role_context(&task.stakeholder.title).text();
        let prompt = format!(
            "{}\n---\nIMPORTANT: Use language and facts from the Customer Report below. Tailor to the role context.\n\nCustomer Report:\n{}\n\nRole Context:\n{}\n---\n",
            substitute(template_prompt, &values),
            reference.product_excerpt(product_budget),
            prefix_chars(&role, role_budget),
        );
        debug!(product_budget, role_budget, chars = prompt.len(), "template prompt assembled");

        let raw = self.ctx.complete(system::TEMPLATE, prompt).await?;

        match resolved {
            Resolved::Complete(_) => Ok(EmailDraft::from_model_output(&raw)?),
            Resolved::BuiltIn {
                template,
                user_fields,
            } => {
                let sections: Map<String, Value> = recover_json(&raw, JsonShape::Object)?;
                Ok(templates::assemble(
                    template,
                    user_fields,
                    &AiSections::new(sections),
                    &task.stakeholder,
                )?)
            }
        }
    }

    fn evaluation_style(&self, task: &GenerationTask) -> String {
        match &task.mode_config {
            ModeConfig::Template(TemplateSource::BuiltIn { template_key, .. }) => {
                format!("template-based ({template_key})")
            }
            ModeConfig::Template(TemplateSource::Stored { template_id, .. }) => {
                format!("template-based (stored #{template_id})")
            }
            _ => "template-based (custom prompt)".to_string(),
        }
    }
}

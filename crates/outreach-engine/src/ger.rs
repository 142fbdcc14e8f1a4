//! Generate, evaluate, refine: the per-stakeholder quality gate.
//!
//! A task moves Drafted -> Evaluated -> Finalized. Every failure after the
//! draft exists degrades to the best draft available, so [`GerEngine::run`]
//! always returns a record.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use outreach_core::email::{EmailDraft, EmailRecord, Evaluation, RecordOutcome};
use outreach_core::prompt::PromptValues;
use outreach_core::store::TemplateStore;
use outreach_core::task::GenerationTask;

use crate::config::{EngineConfig, GateConfig};
use crate::error::StrategyError;
use crate::prompts::review::{EVALUATION_PROMPT, REFINEMENT_PROMPT};
use crate::prompts::system;
use crate::strategy::{GenerationStrategy, StrategyContext, StrategySet};

pub const EVALUATION_FAILED_NOTE: &str = "Evaluation failed, returning initial draft";

fn score_note(score: f64, tail: &str) -> String {
    format!("Initial quality score: {score:.1}/10 | {tail}")
}

pub struct GerEngine {
    ctx: StrategyContext,
    strategies: StrategySet,
    gate: GateConfig,
}

impl GerEngine {
    pub fn new(ctx: StrategyContext, strategies: StrategySet, gate: GateConfig) -> Self {
        Self {
            ctx,
            strategies,
            gate,
        }
    }

    pub fn from_config(
        ctx: StrategyContext,
        config: &EngineConfig,
        store: Option<Arc<dyn TemplateStore>>,
    ) -> Self {
        let ctx = ctx.with_options(config.options.clone());
        let strategies = StrategySet::new(ctx.clone(), &config.default_style, store);
        Self::new(ctx, strategies, config.gate)
    }

    pub fn gate(&self) -> &GateConfig {
        &self.gate
    }

    /// Produce the final record for one task. Never fails; failures are
    /// encoded in the record's outcome and notes.
    #[instrument(skip_all, fields(task_id = %task.id, stakeholder = %task.stakeholder.name, mode = %task.generation_mode))]
    pub async fn run(&self, task: &GenerationTask) -> EmailRecord {
        let strategy = self.strategies.select(task.generation_mode);

        let draft = match strategy.generate(task).await {
            Ok(draft) => draft,
            Err(e) => {
                warn!(error = %e, "draft generation failed");
                return EmailRecord::failed(&task.stakeholder, task.generation_mode, &e.to_string());
            }
        };

        let evaluation = match self.evaluate(&draft, &strategy.evaluation_style(task)).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(error = %e, "evaluation failed, keeping initial draft");
                return self.finalize(task, draft, 0.0, EVALUATION_FAILED_NOTE, RecordOutcome::EvaluationFailed);
            }
        };

        let score = evaluation.overall_score();
        if score >= self.gate.quality_threshold {
            info!(score, "draft accepted");
            return self.finalize(
                task,
                draft,
                score,
                score_note(score, "Quality acceptable, no refinement needed"),
                RecordOutcome::Accepted,
            );
        }

        if !self.gate.refinement_enabled() {
            info!(score, "draft below threshold, refinement disabled");
            return self.finalize(
                task,
                draft,
                score,
                score_note(score, "Below threshold, refinement disabled"),
                RecordOutcome::BelowThreshold,
            );
        }

        match self.refine(task, strategy, &draft, &evaluation).await {
            Ok(refined) => {
                info!(score, "draft refined");
                self.finalize(
                    task,
                    refined,
                    score,
                    score_note(score, "Email refined based on feedback"),
                    RecordOutcome::Refined,
                )
            }
            Err(e) => {
                warn!(score, error = %e, "refinement failed, keeping initial draft");
                self.finalize(
                    task,
                    draft,
                    score,
                    score_note(score, "Refinement failed, using initial draft"),
                    RecordOutcome::RefinementFailed,
                )
            }
        }
    }

    /// Score a draft against the cold-email rubric.
    pub async fn evaluate(&self, draft: &EmailDraft, email_style: &str) -> Result<Evaluation, StrategyError> {
        let values = PromptValues::new()
            .with("subject", draft.subject())
            .with("body", draft.body())
            .with("email_style", email_style);
        let prompt = EVALUATION_PROMPT.render(&values)?;
        let raw = self.ctx.complete(system::EVALUATION, prompt).await?;
        let evaluation = Evaluation::from_model_output(&raw)?;
        debug!(score = evaluation.overall_score(), "draft evaluated");
        Ok(evaluation)
    }

    async fn refine(
        &self,
        task: &GenerationTask,
        strategy: &dyn GenerationStrategy,
        draft: &EmailDraft,
        evaluation: &Evaluation,
    ) -> Result<EmailDraft, StrategyError> {
        let values = PromptValues::new()
            .with("subject", draft.subject())
            .with("body", draft.body())
            .with("overall_score", format!("{:.1}", evaluation.overall_score()))
            .with("weaknesses", evaluation.weaknesses.join(", "))
            .with("improvement_suggestions", evaluation.improvement_suggestions.as_str())
            .with("email_style", strategy.refinement_style(task))
            .with("stakeholder_name", task.stakeholder.name.as_str())
            .with("stakeholder_title", task.stakeholder.title.as_str());
        let prompt = REFINEMENT_PROMPT.render(&values)?;
        let raw = self.ctx.complete(system::REFINEMENT, prompt).await?;
        Ok(EmailDraft::from_model_output(&raw)?)
    }

    fn finalize(
        &self,
        task: &GenerationTask,
        draft: EmailDraft,
        score: f64,
        notes: impl Into<String>,
        outcome: RecordOutcome,
    ) -> EmailRecord {
        EmailRecord::finalized(&task.stakeholder, draft, score, notes, task.generation_mode, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{context, task};
    use outreach_core::errors::CompletionError;
    use outreach_core::task::{GenerationMode, ModeConfig, TemplateSource};
    use outreach_llm::{MockProvider, MockReply, MockRoute};
    use serde_json::json;

    fn engine(mock: Arc<MockProvider>, gate: GateConfig) -> GerEngine {
        let ctx = context(mock, "IntelliSep report");
        let strategies = StrategySet::new(ctx.clone(), "technical_direct", None);
        GerEngine::new(ctx, strategies, gate)
    }

    fn draft(subject: &str, body: &str) -> MockReply {
        MockReply::json(&json!({ "subject": subject, "body": body }))
    }

    fn evaluation(scores: [f64; 7]) -> MockReply {
        MockReply::json(&json!({
            "brevity": scores[0],
            "hospital_specific_evidence": scores[1],
            "healthcare_language": scores[2],
            "directness": scores[3],
            "data_driven": scores[4],
            "clear_cta": scores[5],
            "role_relevance": scores[6],
            "overall_score": 10,
            "strengths": ["short"],
            "weaknesses": ["generic opener", "no metric"],
            "improvement_suggestions": "Lead with the 52% SEP-1 figure."
        }))
    }

    fn ai_task() -> GenerationTask {
        task(ModeConfig::AiStyle { style_key: None })
    }

    #[tokio::test]
    async fn high_score_skips_refinement() {
        let mock = Arc::new(MockProvider::new(vec![
            draft("SEP-1 at 52%", "Original body."),
            evaluation([9.0, 8.0, 9.0, 8.0, 9.0, 8.0, 9.2]),
        ]));
        let record = engine(mock.clone(), GateConfig::default()).run(&ai_task()).await;

        assert_eq!(record.body, "Original body.");
        assert_eq!(record.outcome, RecordOutcome::Accepted);
        assert!((record.quality_score - 8.6).abs() < 1e-9);
        assert_eq!(
            record.reflection_notes,
            "Initial quality score: 8.6/10 | Quality acceptable, no refinement needed"
        );
        // A refinement call would have hit the exhausted script.
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn score_exactly_at_threshold_is_accepted() {
        let mock = Arc::new(MockProvider::new(vec![draft("s", "b"), evaluation([7.0; 7])]));
        let record = engine(mock, GateConfig::default()).run(&ai_task()).await;
        assert_eq!(record.outcome, RecordOutcome::Accepted);
    }

    #[tokio::test]
    async fn low_score_refines_once() {
        let mock = Arc::new(MockProvider::new(vec![
            draft("Hello", "Dear customer, ..."),
            evaluation([4.0; 7]),
            draft("52% SEP-1 compliance", "Jane, your patients ..."),
        ]));
        let record = engine(mock.clone(), GateConfig::default()).run(&ai_task()).await;

        assert_eq!(record.subject, "52% SEP-1 compliance");
        assert_eq!(record.body, "Jane, your patients ...");
        assert_eq!(record.outcome, RecordOutcome::Refined);
        assert!((record.quality_score - 4.0).abs() < 1e-9);
        assert!(record.reflection_notes.ends_with("Email refined based on feedback"));
        assert_eq!(mock.call_count(), 3);

        let refinement = mock.calls()[2].clone();
        assert_eq!(refinement[0].content, system::REFINEMENT);
        let prompt = &refinement[1].content;
        assert!(prompt.contains("Overall Score: 4.0/10"));
        assert!(prompt.contains("Weaknesses: generic opener, no metric"));
        assert!(prompt.contains("Email Style: Concise, specification-focused cold email with clinical data"));
        assert!(prompt.contains("Name: Dr. Jane Smith"));
    }

    #[tokio::test]
    async fn refinement_failure_keeps_original() {
        let mock = Arc::new(MockProvider::new(vec![
            draft("Hello", "Original body."),
            evaluation([3.0; 7]),
            MockReply::text("I could not improve this email."),
        ]));
        let record = engine(mock, GateConfig::default()).run(&ai_task()).await;

        assert_eq!(record.body, "Original body.");
        assert_eq!(record.outcome, RecordOutcome::RefinementFailed);
        assert_eq!(
            record.reflection_notes,
            "Initial quality score: 3.0/10 | Refinement failed, using initial draft"
        );
    }

    #[tokio::test]
    async fn evaluation_failure_returns_draft_with_zero_score() {
        let mock = Arc::new(MockProvider::new(vec![
            draft("Hello", "Original body."),
            MockReply::Error(CompletionError::RateLimited { retry_after: None }),
        ]));
        let record = engine(mock.clone(), GateConfig::default()).run(&ai_task()).await;

        assert_eq!(record.body, "Original body.");
        assert_eq!(record.quality_score, 0.0);
        assert_eq!(record.reflection_notes, EVALUATION_FAILED_NOTE);
        assert_eq!(record.outcome, RecordOutcome::EvaluationFailed);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn unparseable_evaluation_is_evaluation_failure() {
        let mock = Arc::new(MockProvider::new(vec![
            draft("Hello", "Original body."),
            MockReply::text("Looks great to me!"),
        ]));
        let record = engine(mock, GateConfig::default()).run(&ai_task()).await;
        assert_eq!(record.outcome, RecordOutcome::EvaluationFailed);
    }

    #[tokio::test]
    async fn draft_failure_is_error_record() {
        let mock = Arc::new(MockProvider::new(vec![MockReply::Error(
            CompletionError::ServerError {
                status: 503,
                body: "overloaded".into(),
            },
        )]));
        let record = engine(mock.clone(), GateConfig::default()).run(&ai_task()).await;

        assert!(record.is_error());
        assert_eq!(record.subject, "ERROR");
        assert!(record.body.starts_with("Failed to generate email: "));
        assert_eq!(record.quality_score, 0.0);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn refinement_disabled_keeps_low_draft() {
        let mock = Arc::new(MockProvider::new(vec![draft("s", "b"), evaluation([5.0; 7])]));
        let gate = GateConfig {
            max_refinement_passes: 0,
            ..GateConfig::default()
        };
        let record = engine(mock.clone(), gate).run(&ai_task()).await;
        assert_eq!(record.outcome, RecordOutcome::BelowThreshold);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn evaluator_receives_template_style_label() {
        let mock = Arc::new(MockProvider::routed(vec![
            MockRoute::when([system::TEMPLATE]).then(draft("Stored", "Body")),
            MockRoute::when([system::EVALUATION, "Intended Style: template-based (custom prompt)"])
                .then(evaluation([8.0; 7])),
        ]));
        let t = task(ModeConfig::Template(TemplateSource::RawPrompt {
            prompt: "Write to {stakeholder_name}.".into(),
            user_fields: Default::default(),
        }));
        let record = engine(mock, GateConfig::default()).run(&t).await;
        assert_eq!(record.outcome, RecordOutcome::Accepted);
        assert_eq!(record.generation_mode, GenerationMode::Template);
    }
}

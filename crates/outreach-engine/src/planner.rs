use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{stream, FutureExt, StreamExt};
use serde_json::Value;
use tracing::{error, info, info_span, instrument, warn, Instrument};

use outreach_core::email::EmailRecord;
use outreach_core::task::{CompanySummary, GenerationTask, ModeConfig, Stakeholder};

use crate::extractor::ContextExtractor;
use crate::ger::GerEngine;

/// Caller choices that apply to every stakeholder in a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationRequest {
    pub mode_config: ModeConfig,
    /// Owner identity for stored-template lookups.
    pub caller: Option<String>,
    /// Overrides the name derived from the company summary.
    pub company_name: Option<String>,
}

impl GenerationRequest {
    pub fn new(mode_config: ModeConfig) -> Self {
        Self {
            mode_config,
            ..Self::default()
        }
    }

    /// Build from a mode tag and a loosely shaped config object.
    pub fn from_loose(mode: &str, config: &Value) -> Self {
        Self::new(ModeConfig::from_loose(mode, config))
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }
}

/// How a task's relevant context was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextSource {
    Extracted,
    /// Extraction succeeded but found nothing for this stakeholder.
    NothingRelevant,
    /// Extraction failed; the stakeholder's own details stand in.
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedContext {
    pub text: String,
    pub source: ContextSource,
}

fn fallback_context(stakeholder: &Stakeholder) -> String {
    if stakeholder.details.trim().is_empty() {
        format!("No report excerpt available for {}, {}.", stakeholder.name, stakeholder.title)
    } else {
        stakeholder.details.trim().to_string()
    }
}

/// Turns a stakeholder roster into finished records, one independent unit
/// per stakeholder.
pub struct TaskPlanner {
    extractor: ContextExtractor,
    engine: Arc<GerEngine>,
    concurrency: usize,
}

impl TaskPlanner {
    pub fn new(extractor: ContextExtractor, engine: Arc<GerEngine>, concurrency: usize) -> Self {
        Self {
            extractor,
            engine,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn context_for(&self, stakeholder: &Stakeholder, report: &str) -> PlannedContext {
        match self.extractor.extract(stakeholder, report).await {
            Ok(text) if text.is_empty() => {
                info!("no relevant context found in report");
                PlannedContext {
                    text,
                    source: ContextSource::NothingRelevant,
                }
            }
            Ok(text) => PlannedContext {
                text,
                source: ContextSource::Extracted,
            },
            Err(e) => {
                warn!(fallback = true, error = %e, "context extraction failed, using stakeholder details");
                PlannedContext {
                    text: fallback_context(stakeholder),
                    source: ContextSource::Fallback,
                }
            }
        }
    }

    /// Build the task for one stakeholder.
    pub async fn plan(
        &self,
        stakeholder: Stakeholder,
        report: &str,
        company_name: &str,
        summary: Arc<CompanySummary>,
        request: &GenerationRequest,
    ) -> GenerationTask {
        let context = self.context_for(&stakeholder, report).await;
        GenerationTask::new(
            stakeholder,
            company_name,
            summary,
            context.text,
            request.mode_config.clone(),
            request.caller.clone(),
        )
    }

    async fn process(
        &self,
        stakeholder: Stakeholder,
        report: &str,
        company_name: &str,
        summary: Arc<CompanySummary>,
        request: &GenerationRequest,
    ) -> EmailRecord {
        let task = self.plan(stakeholder, report, company_name, summary, request).await;
        self.engine.run(&task).await
    }

    /// Run every stakeholder concurrently. Records come back in roster order
    /// and one unit's failure never affects another.
    #[instrument(skip_all, fields(stakeholders = stakeholders.len(), mode = %request.mode_config.mode()))]
    pub async fn run(
        &self,
        stakeholders: &[Stakeholder],
        report: &str,
        summary: Arc<CompanySummary>,
        request: &GenerationRequest,
    ) -> Vec<EmailRecord> {
        let company_name = request
            .company_name
            .clone()
            .unwrap_or_else(|| summary.company_name());
        let mode = request.mode_config.mode();

        let records: Vec<EmailRecord> = stream::iter(stakeholders.iter().cloned().enumerate())
            .map(|(index, stakeholder)| {
                let span = info_span!("unit", index, stakeholder = %stakeholder.name);
                let fallback = stakeholder.clone();
                let unit = self.process(stakeholder, report, &company_name, Arc::clone(&summary), request);
                AssertUnwindSafe(unit)
                    .catch_unwind()
                    .map(move |result| {
                        result.unwrap_or_else(|_| {
                            error!(stakeholder = %fallback.name, "generation panicked");
                            EmailRecord::failed(&fallback, mode, "internal error during generation")
                        })
                    })
                    .instrument(span)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = records.iter().filter(|r| r.is_error()).count();
        info!(total = records.len(), failed, %company_name, "generation complete");
        records
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::GateConfig;
    use crate::fixtures::*;
    use crate::prompts::system;
    use crate::strategy::{StrategyContext, StrategySet};
    use outreach_core::email::RecordOutcome;
    use outreach_core::errors::CompletionError;
    use outreach_core::messages::ChatMessage;
    use outreach_core::provider::{CompletionOptions, CompletionProvider};
    use outreach_llm::{MockProvider, MockReply, MockRoute};

    fn planner(mock: Arc<MockProvider>, concurrency: usize) -> TaskPlanner {
        let ctx = StrategyContext::new(mock.clone(), reference());
        let strategies = StrategySet::new(ctx.clone(), "technical_direct", None);
        let engine = GerEngine::new(ctx, strategies, GateConfig::default());
        TaskPlanner::new(
            ContextExtractor::new(mock, CompletionOptions::default()),
            Arc::new(engine),
            concurrency,
        )
    }

    fn roster() -> Vec<Stakeholder> {
        vec![
            Stakeholder::new(JANE, "CTO", "Leads the EHR migration"),
            Stakeholder::new(MICHAEL, "VP of Product", "Runs the patient-flow program"),
        ]
    }

    fn summary() -> Arc<CompanySummary> {
        Arc::new(CompanySummary::new(SAMPLE_SUMMARY))
    }

    #[tokio::test]
    async fn records_follow_roster_order() {
        let mock = routed(vec![
            MockRoute::when([system::RESEARCH.to_string(), format!("Name: {JANE}")]).always(MockReply::delayed(
                Duration::from_millis(50),
                MockReply::text("Jane owns decision support."),
            )),
            context_route(MICHAEL, "Michael runs patient flow."),
            ai_draft_route(JANE, "For Jane", "Jane body"),
            ai_draft_route(MICHAEL, "For Michael", "Michael body"),
            evaluation_route("For Jane", PASSING_SCORES),
            evaluation_route("For Michael", PASSING_SCORES),
        ]);
        let records = planner(mock, 4)
            .run(&roster(), SAMPLE_REPORT, summary(), &GenerationRequest::default())
            .await;

        let names: Vec<_> = records.iter().map(|r| r.stakeholder_name.as_str()).collect();
        assert_eq!(names, [JANE, MICHAEL]);
        assert_eq!(records[0].subject, "For Jane");
    }

    #[tokio::test]
    async fn one_failure_does_not_block_others() {
        let mock = routed(vec![
            context_route(JANE, "Jane owns decision support."),
            context_route(MICHAEL, "Michael runs patient flow."),
            MockRoute::when([system::AI_STYLE.to_string(), format!("Name: {JANE}")])
                .always(MockReply::Error(CompletionError::ProviderOverloaded)),
            ai_draft_route(MICHAEL, "For Michael", "Michael body"),
            evaluation_route("For Michael", PASSING_SCORES),
        ]);
        let records = planner(mock, 2)
            .run(&roster(), SAMPLE_REPORT, summary(), &GenerationRequest::default())
            .await;

        assert_eq!(records.len(), 2);
        assert!(records[0].is_error());
        assert_eq!(records[1].outcome, RecordOutcome::Accepted);
    }

    /// Panics on drafting calls for one stakeholder, delegates otherwise.
    struct PanicsFor {
        inner: Arc<MockProvider>,
        name: &'static str,
    }

    #[async_trait::async_trait]
    impl CompletionProvider for PanicsFor {
        fn name(&self) -> &str {
            "panics-for"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            options: &CompletionOptions,
        ) -> Result<String, CompletionError> {
            let text: String = messages.iter().map(|m| m.content.as_str()).collect();
            if text.contains(system::AI_STYLE) && text.contains(&format!("Name: {}", self.name)) {
                panic!("drafting blew up for {}", self.name);
            }
            self.inner.complete(messages, options).await
        }
    }

    #[tokio::test]
    async fn panic_in_one_unit_becomes_error_record() {
        let mock = routed(vec![
            context_route(JANE, "Jane owns decision support."),
            context_route(MICHAEL, "Michael runs patient flow."),
            ai_draft_route(MICHAEL, "For Michael", "Michael body"),
            evaluation_route("For Michael", PASSING_SCORES),
        ]);
        let provider: Arc<dyn CompletionProvider> = Arc::new(PanicsFor { inner: mock, name: JANE });
        let ctx = StrategyContext::new(Arc::clone(&provider), reference());
        let strategies = StrategySet::new(ctx.clone(), "technical_direct", None);
        let planner = TaskPlanner::new(
            ContextExtractor::new(provider, CompletionOptions::default()),
            Arc::new(GerEngine::new(ctx, strategies, GateConfig::default())),
            2,
        );

        let records = planner
            .run(&roster(), SAMPLE_REPORT, summary(), &GenerationRequest::default())
            .await;
        assert_eq!(records.len(), 2);
        assert!(records[0].is_error());
        assert_eq!(records[0].stakeholder_name, JANE);
        assert_eq!(records[1].outcome, RecordOutcome::Accepted);
    }

    #[tokio::test]
    async fn extraction_failure_falls_back_to_details() {
        let mock = routed(vec![MockRoute::when([system::RESEARCH])
            .always(MockReply::Error(CompletionError::NetworkError("reset".into())))]);
        let context = planner(mock, 1).context_for(&roster()[0], SAMPLE_REPORT).await;
        assert_eq!(context.source, ContextSource::Fallback);
        assert_eq!(context.text, "Leads the EHR migration");
    }

    #[tokio::test]
    async fn empty_extraction_is_nothing_relevant() {
        let mock = routed(vec![context_route(JANE, "")]);
        let context = planner(mock, 1).context_for(&roster()[0], SAMPLE_REPORT).await;
        assert_eq!(context.source, ContextSource::NothingRelevant);
        assert!(context.text.is_empty());
    }

    #[tokio::test]
    async fn tasks_share_summary_and_request() {
        let mock = routed(vec![context_route(JANE, "Jane owns decision support.")]);
        let shared = summary();
        let request = GenerationRequest::new(ModeConfig::Custom {
            instructions: "Mention the SEP-1 bundle and ask for a call.".into(),
        })
        .with_caller("alice")
        .with_company_name("TechCorp");

        let task = planner(mock, 1)
            .plan(roster()[0].clone(), SAMPLE_REPORT, "TechCorp", Arc::clone(&shared), &request)
            .await;
        assert!(Arc::ptr_eq(&task.company_summary, &shared));
        assert_eq!(task.relevant_context, "Jane owns decision support.");
        assert_eq!(task.caller.as_deref(), Some("alice"));
        assert_eq!(task.mode_config, request.mode_config);
    }

    #[tokio::test]
    async fn company_name_derived_from_summary() {
        let mock = routed(vec![
            context_route(JANE, "Jane owns decision support."),
            MockRoute::when([system::AI_STYLE, "Hospital: TechCorp Solutions\n"])
                .always(draft_reply("For Jane", "Jane body")),
            evaluation_route("For Jane", PASSING_SCORES),
        ]);
        let records = planner(mock, 1)
            .run(&roster()[..1], SAMPLE_REPORT, summary(), &GenerationRequest::default())
            .await;
        assert_eq!(records[0].outcome, RecordOutcome::Accepted);
    }

    #[test]
    fn loose_request_parses_mode() {
        let request = GenerationRequest::from_loose("bogus", &serde_json::json!({"style_key": "casual_broy"}));
        assert_eq!(request.mode_config, ModeConfig::AiStyle { style_key: None });
    }
}

//! Top-level run: report in, ordered records out.
//!
//! The report is read once, the stakeholder roster and the company summary
//! are extracted concurrently from the full text, and the selected
//! stakeholders are handed to the [`TaskPlanner`]. Only failures shared by
//! every stakeholder abort a run.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, info_span, instrument, warn, Instrument};

use outreach_core::email::EmailRecord;
use outreach_core::ids::RunId;
use outreach_core::json::{recover_json, JsonShape};
use outreach_core::messages::framed;
use outreach_core::prompt::{PromptTemplate, PromptValues};
use outreach_core::provider::{CompletionOptions, CompletionProvider};
use outreach_core::store::TemplateStore;
use outreach_core::task::{CompanySummary, Stakeholder};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::extractor::ContextExtractor;
use crate::ger::GerEngine;
use crate::planner::{GenerationRequest, TaskPlanner};
use crate::prompts::research::{COMPANY_SUMMARY_PROMPT, STAKEHOLDER_EXTRACTION_PROMPT};
use crate::prompts::system;
use crate::reference::ReferenceMaterial;
use crate::strategy::StrategyContext;

/// Where the research report comes from.
#[derive(Clone, Debug)]
pub enum ReportSource {
    Text(String),
    File(PathBuf),
}

impl ReportSource {
    pub async fn load(&self) -> Result<String, EngineError> {
        let text = match self {
            Self::Text(text) => text.clone(),
            Self::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| EngineError::ReportUnavailable(format!("{}: {e}", path.display())))?,
        };
        if text.trim().is_empty() {
            return Err(EngineError::EmptyReport);
        }
        Ok(text)
    }
}

/// Roster and summary pulled from one report.
#[derive(Clone, Debug)]
pub struct ReportAnalysis {
    pub report: String,
    pub stakeholders: Vec<Stakeholder>,
    pub summary: Arc<CompanySummary>,
}

/// Output of a complete run.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub run_id: RunId,
    pub company_name: String,
    pub summary: Arc<CompanySummary>,
    pub records: Vec<EmailRecord>,
}

/// Chooses which extracted stakeholders get an email. Returns 0-based indices.
#[async_trait]
pub trait StakeholderSelector: Send + Sync {
    async fn select(&self, stakeholders: &[Stakeholder]) -> Result<Vec<usize>, EngineError>;
}

/// Selects everyone; the programmatic path.
pub struct AllStakeholders;

#[async_trait]
impl StakeholderSelector for AllStakeholders {
    async fn select(&self, stakeholders: &[Stakeholder]) -> Result<Vec<usize>, EngineError> {
        Ok((0..stakeholders.len()).collect())
    }
}

/// Parse a 1-based selection such as `1,3`, `2-4` or `all` into 0-based
/// indices, keeping first-mention order and dropping repeats.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, EngineError> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return Ok((0..count).collect());
    }

    let position = |raw: &str| -> Result<usize, EngineError> {
        let n: usize = raw
            .trim()
            .parse()
            .map_err(|_| EngineError::Selection(format!("`{}` is not a number", raw.trim())))?;
        if n == 0 || n > count {
            return Err(EngineError::Selection(format!("{n} is outside 1..={count}")));
        }
        Ok(n - 1)
    };

    let mut picked = Vec::new();
    for part in input.split(',').filter(|p| !p.trim().is_empty()) {
        let indices = match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (position(start)?, position(end)?);
                if start > end {
                    return Err(EngineError::Selection(format!("range `{}` is reversed", part.trim())));
                }
                (start..=end).collect::<Vec<_>>()
            }
            None => vec![position(part)?],
        };
        for idx in indices {
            if !picked.contains(&idx) {
                picked.push(idx);
            }
        }
    }

    if picked.is_empty() {
        return Err(EngineError::Selection("no stakeholders selected".into()));
    }
    Ok(picked)
}

pub struct Orchestrator {
    provider: Arc<dyn CompletionProvider>,
    research_options: CompletionOptions,
    planner: TaskPlanner,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        reference: Arc<ReferenceMaterial>,
        config: &EngineConfig,
        store: Option<Arc<dyn TemplateStore>>,
    ) -> Self {
        let ctx = StrategyContext::new(Arc::clone(&provider), reference);
        let engine = GerEngine::from_config(ctx, config, store);
        let extractor = ContextExtractor::new(Arc::clone(&provider), config.research_options.clone());
        Self {
            provider,
            research_options: config.research_options.clone(),
            planner: TaskPlanner::new(extractor, Arc::new(engine), config.concurrency),
        }
    }

    async fn research(&self, template: &PromptTemplate<'_>, report: &str) -> Result<String, String> {
        let prompt = template
            .render(&PromptValues::new().with("report", report))
            .map_err(|e| e.to_string())?;
        self.provider
            .complete(&framed(system::RESEARCH, prompt), &self.research_options)
            .await
            .map_err(|e| e.to_string())
    }

    /// Extract the stakeholder roster. Entries missing a name or title are
    /// dropped; an empty roster is fatal.
    pub async fn extract_stakeholders(&self, report: &str) -> Result<Vec<Stakeholder>, EngineError> {
        let raw = self
            .research(&STAKEHOLDER_EXTRACTION_PROMPT, report)
            .await
            .map_err(EngineError::StakeholderExtraction)?;
        let entries: Vec<Value> =
            recover_json(&raw, JsonShape::Array).map_err(|e| EngineError::StakeholderExtraction(e.to_string()))?;

        let total = entries.len();
        let mut stakeholders = Vec::with_capacity(total);
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Stakeholder>(entry) {
                Ok(s) if s.is_complete() => stakeholders.push(s),
                Ok(s) => warn!(index, name = %s.name, title = %s.title, "ignored stakeholder missing name or title"),
                Err(e) => warn!(index, error = %e, "ignored malformed stakeholder entry"),
            }
        }
        if stakeholders.len() < total {
            warn!(dropped = total - stakeholders.len(), total, "roster had unusable entries");
        }
        if stakeholders.is_empty() {
            return Err(EngineError::NoStakeholders);
        }
        Ok(stakeholders)
    }

    pub async fn summarize(&self, report: &str) -> Result<CompanySummary, EngineError> {
        let raw = self
            .research(&COMPANY_SUMMARY_PROMPT, report)
            .await
            .map_err(EngineError::SummaryExtraction)?;
        let summary = CompanySummary::new(raw);
        if summary.is_empty() {
            return Err(EngineError::SummaryExtraction("model returned an empty summary".into()));
        }
        Ok(summary)
    }

    /// Load the report and run both extractions concurrently.
    #[instrument(skip_all)]
    pub async fn analyze(&self, source: &ReportSource) -> Result<ReportAnalysis, EngineError> {
        let report = source.load().await?;
        info!(chars = report.len(), "report loaded");

        let (stakeholders, summary) =
            tokio::try_join!(self.extract_stakeholders(&report), self.summarize(&report))?;
        info!(stakeholders = stakeholders.len(), "report analyzed");

        Ok(ReportAnalysis {
            report,
            stakeholders,
            summary: Arc::new(summary),
        })
    }

    /// Generate for an already analyzed, already selected roster.
    pub async fn generate_for(
        &self,
        run_id: RunId,
        report: &str,
        stakeholders: &[Stakeholder],
        summary: Arc<CompanySummary>,
        request: &GenerationRequest,
    ) -> RunOutput {
        let company_name = request
            .company_name
            .clone()
            .unwrap_or_else(|| summary.company_name());
        let request = GenerationRequest {
            company_name: Some(company_name.clone()),
            ..request.clone()
        };
        let records = self
            .planner
            .run(stakeholders, report, Arc::clone(&summary), &request)
            .await;
        RunOutput {
            run_id,
            company_name,
            summary,
            records,
        }
    }

    /// Full run with a caller-chosen subset of the extracted roster.
    pub async fn run_interactive(
        &self,
        source: &ReportSource,
        selector: &dyn StakeholderSelector,
        request: &GenerationRequest,
    ) -> Result<RunOutput, EngineError> {
        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id, mode = %request.mode_config.mode());
        async move {
            let analysis = self.analyze(source).await?;
            let indices = selector.select(&analysis.stakeholders).await?;
            let selected: Vec<Stakeholder> = indices
                .iter()
                .filter_map(|&i| analysis.stakeholders.get(i).cloned())
                .collect();
            if selected.is_empty() {
                return Err(EngineError::Selection("no stakeholders selected".into()));
            }
            info!(selected = selected.len(), of = analysis.stakeholders.len(), "stakeholders selected");
            Ok(self
                .generate_for(run_id, &analysis.report, &selected, analysis.summary, request)
                .await)
        }
        .instrument(span)
        .await
    }

    /// Full run over every extracted stakeholder.
    pub async fn run_all(&self, source: &ReportSource, request: &GenerationRequest) -> Result<RunOutput, EngineError> {
        self.run_interactive(source, &AllStakeholders, request).await
    }
}

use outreach_core::email::DraftError;
use outreach_core::errors::CompletionError;
use outreach_core::json::JsonRecoveryError;
use outreach_core::prompt::PromptError;
use outreach_core::store::LookupError;

/// Run-level failures. Any of these aborts the run before tasks exist.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("report unavailable: {0}")]
    ReportUnavailable(String),

    #[error("report is empty")]
    EmptyReport,

    #[error("stakeholder extraction failed: {0}")]
    StakeholderExtraction(String),

    #[error("company summary extraction failed: {0}")]
    SummaryExtraction(String),

    #[error("no stakeholders found in report")]
    NoStakeholders,

    #[error("invalid selection: {0}")]
    Selection(String),

    #[error("provider error: {0}")]
    Provider(#[from] CompletionError),
}

/// Why a strategy could not produce a draft. Always terminal for the task.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("{0}")]
    Draft(#[from] DraftError),

    #[error("{0}")]
    Json(#[from] JsonRecoveryError),

    #[error("{0}")]
    Prompt(#[from] PromptError),

    #[error("template store: {0}")]
    Lookup(#[from] LookupError),

    #[error("template {template_id} not found for {owner}")]
    TemplateNotFound { template_id: i64, owner: String },

    #[error("stored template {0} requested without a caller identity")]
    MissingCaller(i64),

    #[error("unknown template key `{0}`")]
    UnknownTemplate(String),

    #[error("{strategy} strategy received {got} configuration")]
    ConfigMismatch {
        strategy: &'static str,
        got: &'static str,
    },
}

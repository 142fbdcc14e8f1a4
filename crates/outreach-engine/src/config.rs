use outreach_core::provider::CompletionOptions;

use crate::prompts::styles::DEFAULT_STYLE_KEY;

pub const DEFAULT_QUALITY_THRESHOLD: f64 = 7.0;
pub const DEFAULT_CONCURRENCY: usize = 8;
/// Roster and context answers run longer than a single email.
pub const DEFAULT_RESEARCH_MAX_TOKENS: u32 = 2048;

/// Quality gate for the review loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateConfig {
    pub quality_threshold: f64,
    /// 0 disables refinement; anything above 1 is treated as 1.
    pub max_refinement_passes: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            max_refinement_passes: 1,
        }
    }
}

impl GateConfig {
    pub fn refinement_enabled(&self) -> bool {
        self.max_refinement_passes > 0
    }
}

/// Everything the engine needs that is not a collaborator.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub gate: GateConfig,
    pub default_style: String,
    /// Upper bound on stakeholders processed at once.
    pub concurrency: usize,
    /// Draft, evaluation and refinement calls.
    pub options: CompletionOptions,
    /// Roster, summary and per-stakeholder context extraction.
    pub research_options: CompletionOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            default_style: DEFAULT_STYLE_KEY.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            options: CompletionOptions::default(),
            research_options: CompletionOptions::with_max_tokens(DEFAULT_RESEARCH_MAX_TOKENS),
        }
    }
}

//! Settings tree. Every section fills missing keys from its `Default`.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutreachSettings {
    pub llm: LlmSettings,
    pub generation: GenerationSettings,
    pub reference: ReferenceSettings,
    pub retry: RetrySettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
}

impl OutreachSettings {
    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.generation.quality_threshold;
        if !(0.0..=10.0).contains(&threshold) {
            return Err(SettingsError::InvalidValue(format!(
                "generation.qualityThreshold must be within 0-10, got {threshold}"
            )));
        }
        if self.generation.max_refinement_passes > 1 {
            return Err(SettingsError::InvalidValue(
                "generation.maxRefinementPasses may be 0 or 1".into(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(SettingsError::InvalidValue("llm.maxTokens must be positive".into()));
        }
        if self.generation.concurrency == 0 {
            return Err(SettingsError::InvalidValue(
                "generation.concurrency must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// Output cap for draft, evaluation and refinement calls.
    pub max_tokens: u32,
    /// Output cap for roster, summary and context extraction.
    pub research_max_tokens: u32,
    pub temperature: Option<f64>,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-2.5-flash".to_string(),
            max_tokens: 1024,
            research_max_tokens: 2048,
            temperature: None,
            timeout_secs: 120,
            api_key_env: "OPENROUTER_API_KEY".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    pub quality_threshold: f64,
    pub max_refinement_passes: u32,
    pub default_style: String,
    /// Upper bound on stakeholder pipelines in flight at once.
    pub concurrency: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            quality_threshold: 7.0,
            max_refinement_passes: 1,
            default_style: "technical_direct".to_string(),
            concurrency: 8,
        }
    }
}

/// Reference material loaded once per engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceSettings {
    pub product_report_path: Option<String>,
    pub role_library_path: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// 0 disables the retry layer entirely.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 1000,
            max_delay_ms: 20_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    /// "pretty" or "json".
    pub format: String,
    pub persist_warnings: bool,
    pub log_db_path: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            persist_warnings: false,
            log_db_path: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// SQLite file for saved templates; defaults under `~/.outreach`.
    pub template_db_path: Option<String>,
}

//! Turns loaded settings into the concrete collaborators a run needs.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, Level};

use outreach_core::provider::{CompletionOptions, CompletionProvider};
use outreach_engine::{EngineConfig, GateConfig, ReferenceMaterial};
use outreach_llm::{ApiKey, OpenRouterConfig, OpenRouterProvider, ReliableConfig, ReliableProvider};
use outreach_settings::{outreach_home, OutreachSettings};
use outreach_store::{Database, TemplateRepo};
use outreach_telemetry::{LogFormat, TelemetryConfig};

/// Build the completion provider, wrapped in the retry layer when retries
/// are configured.
pub fn build_provider(settings: &OutreachSettings) -> Result<Arc<dyn CompletionProvider>> {
    let llm = &settings.llm;
    let key = std::env::var(&llm.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .with_context(|| format!("{} is not set", llm.api_key_env))?;

    let mut config = OpenRouterConfig::new(ApiKey::new(key));
    config.base_url = llm.base_url.clone();
    config.model = llm.model.clone();
    config.request_timeout = Duration::from_secs(llm.timeout_secs);
    let provider = OpenRouterProvider::new(config).context("failed to build OpenRouter client")?;

    let retry = &settings.retry;
    if retry.max_retries == 0 {
        return Ok(Arc::new(provider));
    }
    info!(max_retries = retry.max_retries, "retry layer enabled");
    Ok(Arc::new(ReliableProvider::new(
        provider,
        ReliableConfig {
            max_retries: retry.max_retries,
            base_delay: Duration::from_millis(retry.base_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            ..ReliableConfig::default()
        },
    )))
}

pub fn engine_config(settings: &OutreachSettings) -> EngineConfig {
    let generation = &settings.generation;
    EngineConfig {
        gate: GateConfig {
            quality_threshold: generation.quality_threshold,
            max_refinement_passes: generation.max_refinement_passes,
        },
        default_style: generation.default_style.clone(),
        concurrency: generation.concurrency,
        options: CompletionOptions {
            max_tokens: settings.llm.max_tokens,
            temperature: settings.llm.temperature,
        },
        research_options: CompletionOptions {
            max_tokens: settings.llm.research_max_tokens,
            temperature: settings.llm.temperature,
        },
    }
}

pub fn telemetry_config(settings: &OutreachSettings) -> TelemetryConfig {
    let logging = &settings.logging;
    let mut config = TelemetryConfig {
        log_level: Level::from_str(&logging.level).unwrap_or(Level::INFO),
        format: logging.format.parse().unwrap_or(LogFormat::Pretty),
        persist_warnings: logging.persist_warnings,
        ..TelemetryConfig::default()
    };
    if let Some(path) = &logging.log_db_path {
        config.log_db_path = PathBuf::from(path);
    }
    config
}

pub fn reference_material(settings: &OutreachSettings) -> ReferenceMaterial {
    let reference = &settings.reference;
    ReferenceMaterial::load(
        reference.product_report_path.as_deref().map(std::path::Path::new),
        reference.role_library_path.as_deref().map(std::path::Path::new),
    )
}

pub fn template_db_path(settings: &OutreachSettings) -> PathBuf {
    settings
        .store
        .template_db_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| outreach_home().join("templates.db"))
}

pub fn open_template_repo(settings: &OutreachSettings) -> Result<TemplateRepo> {
    let path = template_db_path(settings);
    let db = Database::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(TemplateRepo::new(db))
}

//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`OutreachSettings::default()`]
//! 2. If `~/.outreach/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `OUTREACH_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::OutreachSettings;

/// Resolve the directory holding settings and local databases (`~/.outreach`).
pub fn outreach_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".outreach")
}

/// Resolve the path to the settings file (`~/.outreach/settings.json`).
pub fn settings_path() -> PathBuf {
    outreach_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<OutreachSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or values that fail
/// [`OutreachSettings::validate`] are errors.
pub fn load_settings_from_path(path: &Path) -> Result<OutreachSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<OutreachSettings> {
    let defaults = serde_json::to_value(OutreachSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `OUTREACH_*` overrides from the process environment.
///
/// Invalid values are logged and ignored, falling back to file/default.
pub fn apply_env_overrides(settings: &mut OutreachSettings) {
    apply_overrides(settings, &|name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
pub fn apply_overrides(settings: &mut OutreachSettings, lookup: &dyn Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── LLM ─────────────────────────────────────────────────────────
    if let Some(v) = env.string("OUTREACH_MODEL") {
        settings.llm.model = v;
    }
    if let Some(v) = env.string("OUTREACH_BASE_URL") {
        settings.llm.base_url = v;
    }
    if let Some(v) = env.u64("OUTREACH_MAX_TOKENS", 1, 32_768) {
        settings.llm.max_tokens = v as u32;
    }
    if let Some(v) = env.u64("OUTREACH_RESEARCH_MAX_TOKENS", 1, 32_768) {
        settings.llm.research_max_tokens = v as u32;
    }
    if let Some(v) = env.f64("OUTREACH_TEMPERATURE", 0.0, 2.0) {
        settings.llm.temperature = Some(v);
    }
    if let Some(v) = env.u64("OUTREACH_TIMEOUT_SECS", 1, 3600) {
        settings.llm.timeout_secs = v;
    }
    if let Some(v) = env.string("OUTREACH_API_KEY_ENV") {
        settings.llm.api_key_env = v;
    }

    // ── Generation ──────────────────────────────────────────────────
    if let Some(v) = env.f64("OUTREACH_QUALITY_THRESHOLD", 0.0, 10.0) {
        settings.generation.quality_threshold = v;
    }
    if let Some(v) = env.u64("OUTREACH_MAX_REFINEMENTS", 0, 1) {
        settings.generation.max_refinement_passes = v as u32;
    }
    if let Some(v) = env.string("OUTREACH_DEFAULT_STYLE") {
        settings.generation.default_style = v;
    }
    if let Some(v) = env.u64("OUTREACH_CONCURRENCY", 1, 64) {
        settings.generation.concurrency = v as usize;
    }

    // ── Reference material ──────────────────────────────────────────
    if let Some(v) = env.string("OUTREACH_PRODUCT_REPORT") {
        settings.reference.product_report_path = Some(v);
    }
    if let Some(v) = env.string("OUTREACH_ROLE_LIBRARY") {
        settings.reference.role_library_path = Some(v);
    }

    // ── Retry ───────────────────────────────────────────────────────
    if let Some(v) = env.u64("OUTREACH_MAX_RETRIES", 0, 10) {
        settings.retry.max_retries = v as u32;
    }
    if let Some(v) = env.u64("OUTREACH_RETRY_BASE_MS", 10, 60_000) {
        settings.retry.base_delay_ms = v;
    }

    // ── Logging / storage ───────────────────────────────────────────
    if let Some(v) = env.string("OUTREACH_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("OUTREACH_LOG_FORMAT") {
        settings.logging.format = v;
    }
    if let Some(v) = env.bool("OUTREACH_PERSIST_WARNINGS") {
        settings.logging.persist_warnings = v;
    }
    if let Some(v) = env.string("OUTREACH_TEMPLATE_DB") {
        settings.store.template_db_path = Some(v);
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a finite `f64` within a range.
pub fn parse_f64_range(val: &str, min: f64, max: f64) -> Option<f64> {
    let n: f64 = val.trim().parse().ok()?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvReader<'_> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid integer env var, ignoring");
        }
        result
    }

    fn f64(&self, name: &str, min: f64, max: f64) -> Option<f64> {
        let val = (self.lookup)(name)?;
        let result = parse_f64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid number env var, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"llm": {"model": "a", "maxTokens": 1024}});
        let source = serde_json::json!({"llm": {"model": "b"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["llm"]["model"], "b");
        assert_eq!(merged["llm"]["maxTokens"], 1024);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = read_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, OutreachSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"generation": {"qualityThreshold": 8.5}, "retry": {"maxRetries": 3}}"#,
        )
        .unwrap();

        let settings = read_file_layer(&path).unwrap();
        assert_eq!(settings.generation.quality_threshold, 8.5);
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.generation.max_refinement_passes, 1);
        assert_eq!(settings.retry.base_delay_ms, 1000);
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn out_of_range_file_value_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"generation": {"maxRefinementPasses": 4}}"#).unwrap();
        let settings = read_file_layer(&path).unwrap();
        assert!(matches!(settings.validate(), Err(SettingsError::InvalidValue(_))));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let mut settings = OutreachSettings::default();
        let lookup = vars(&[
            ("OUTREACH_MODEL", "anthropic/claude-sonnet"),
            ("OUTREACH_QUALITY_THRESHOLD", "8"),
            ("OUTREACH_PRODUCT_REPORT", "/data/report.md"),
            ("OUTREACH_PERSIST_WARNINGS", "yes"),
            ("OUTREACH_MAX_RETRIES", "2"),
            ("OUTREACH_RESEARCH_MAX_TOKENS", "4096"),
        ]);
        apply_overrides(&mut settings, &lookup);
        assert_eq!(settings.llm.research_max_tokens, 4096);
        assert_eq!(settings.llm.model, "anthropic/claude-sonnet");
        assert_eq!(settings.generation.quality_threshold, 8.0);
        assert_eq!(
            settings.reference.product_report_path.as_deref(),
            Some("/data/report.md")
        );
        assert!(settings.logging.persist_warnings);
        assert_eq!(settings.retry.max_retries, 2);
    }

    #[test]
    fn invalid_overrides_ignored() {
        let mut settings = OutreachSettings::default();
        let lookup = vars(&[
            ("OUTREACH_QUALITY_THRESHOLD", "eleven"),
            ("OUTREACH_MAX_TOKENS", "0"),
            ("OUTREACH_PERSIST_WARNINGS", "maybe"),
            ("OUTREACH_MODEL", ""),
        ]);
        apply_overrides(&mut settings, &lookup);
        assert_eq!(settings, OutreachSettings::default());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u64_range("5", 1, 10), Some(5));
        assert_eq!(parse_u64_range("11", 1, 10), None);
        assert_eq!(parse_u64_range("-1", 0, 10), None);
        assert_eq!(parse_f64_range(" 7.5 ", 0.0, 10.0), Some(7.5));
        assert_eq!(parse_f64_range("NaN", 0.0, 10.0), None);
        assert_eq!(parse_f64_range("10.1", 0.0, 10.0), None);
    }
}

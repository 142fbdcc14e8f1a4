use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ids::TaskId;

/// A person at the target organization who may receive an email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub details: String,
}

/// Models answer `null` for "nothing known"; treat it like an absent field.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

const HONORIFICS: [&str; 6] = ["dr", "mr", "mrs", "ms", "prof", "mx"];

impl Stakeholder {
    pub fn new(name: impl Into<String>, title: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            details: details.into(),
        }
    }

    /// Given name with a leading honorific skipped ("Dr. Jane Smith" -> "Jane").
    pub fn first_name(&self) -> &str {
        let mut parts = self.name.split_whitespace().peekable();
        while let Some(part) = parts.next() {
            let bare = part.trim_end_matches('.').to_ascii_lowercase();
            if HONORIFICS.contains(&bare.as_str()) && parts.peek().is_some() {
                continue;
            }
            return part;
        }
        ""
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.title.trim().is_empty()
    }
}

impl fmt::Display for Stakeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.title)
    }
}

/// Free-text synthesis of the organization, produced once per run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanySummary(String);

pub const UNKNOWN_COMPANY: &str = "the organization";

impl CompanySummary {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Best-effort organization name. Summaries usually open with either
    /// "Name: ..." or "Name is a ...".
    pub fn company_name(&self) -> String {
        let first_line = self.0.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let first_line = first_line.trim().trim_start_matches('#').trim();

        if let Some((head, _)) = first_line.split_once(':') {
            let head = head.trim().trim_matches('*').trim();
            if !head.is_empty() && head.split_whitespace().count() <= 6 {
                return head.to_string();
            }
        }
        for verb in [" is a ", " is an ", " is the ", " operates "] {
            if let Some(idx) = first_line.find(verb) {
                let head = first_line[..idx].trim().trim_matches('*').trim();
                if !head.is_empty() && head.split_whitespace().count() <= 8 {
                    return head.to_string();
                }
            }
        }
        UNKNOWN_COMPANY.to_string()
    }
}

/// Which generation strategy a task uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    AiStyle,
    Template,
    Custom,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiStyle => "ai_style",
            Self::Template => "template",
            Self::Custom => "custom",
        }
    }

    /// Parse a caller-supplied tag. Unknown tags become `AiStyle` with a
    /// warning rather than failing the run.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ai_style" | "style" | "ai" => Self::AiStyle,
            "template" => Self::Template,
            "custom" => Self::Custom,
            other => {
                tracing::warn!(mode = other, "unknown generation mode, falling back to ai_style");
                Self::AiStyle
            }
        }
    }
}

impl FromStr for GenerationMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a template-mode prompt comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TemplateSource {
    /// A complete prompt supplied inline.
    RawPrompt {
        prompt: String,
        #[serde(default)]
        user_fields: BTreeMap<String, String>,
    },
    /// A prompt saved in the caller's template store.
    Stored {
        template_id: i64,
        #[serde(default)]
        user_fields: BTreeMap<String, String>,
    },
    /// A built-in skeleton plus the caller's field values.
    BuiltIn {
        template_key: String,
        #[serde(default)]
        user_fields: BTreeMap<String, String>,
    },
}

impl TemplateSource {
    /// Caller field values substituted into the template prompt.
    pub fn user_fields(&self) -> &BTreeMap<String, String> {
        match self {
            Self::RawPrompt { user_fields, .. }
            | Self::Stored { user_fields, .. }
            | Self::BuiltIn { user_fields, .. } => user_fields,
        }
    }
}

pub const DEFAULT_TEMPLATE_KEY: &str = "problem_solution";

/// Strategy-specific configuration. Only the matching strategy reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeConfig {
    AiStyle {
        #[serde(default)]
        style_key: Option<String>,
    },
    Template(TemplateSource),
    Custom { instructions: String },
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self::AiStyle { style_key: None }
    }
}

impl ModeConfig {
    pub fn mode(&self) -> GenerationMode {
        match self {
            Self::AiStyle { .. } => GenerationMode::AiStyle,
            Self::Template(_) => GenerationMode::Template,
            Self::Custom { .. } => GenerationMode::Custom,
        }
    }

    /// Build a config from a mode tag and a loosely shaped JSON object, the
    /// form callers outside Rust hand us. Accepts both snake_case and the
    /// camelCase `promptTemplate` / `templateId` keys.
    pub fn from_loose(mode: &str, config: &Value) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| config.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        };

        match GenerationMode::parse_lenient(mode) {
            GenerationMode::AiStyle if mode_is_known(mode) => Self::AiStyle {
                style_key: text(&["style_key", "styleKey", "style"]),
            },
            GenerationMode::AiStyle => Self::default(),
            GenerationMode::Custom => Self::Custom {
                instructions: text(&["custom_instructions", "customInstructions", "instructions"])
                    .unwrap_or_default(),
            },
            GenerationMode::Template => {
                let user_fields: BTreeMap<String, String> = config
                    .get("user_fields")
                    .or_else(|| config.get("userFields"))
                    .and_then(Value::as_object)
                    .map(|obj| {
                        obj.iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                            .collect()
                    })
                    .unwrap_or_default();
                if let Some(prompt) = text(&["promptTemplate", "prompt_template", "prompt"]) {
                    return Self::Template(TemplateSource::RawPrompt { prompt, user_fields });
                }
                if let Some(id) = ["template_id", "templateId"]
                    .iter()
                    .find_map(|k| config.get(*k).and_then(Value::as_i64))
                {
                    return Self::Template(TemplateSource::Stored {
                        template_id: id,
                        user_fields,
                    });
                }
                Self::Template(TemplateSource::BuiltIn {
                    template_key: text(&["template_key", "templateKey"])
                        .unwrap_or_else(|| DEFAULT_TEMPLATE_KEY.to_string()),
                    user_fields,
                })
            }
        }
    }
}

fn mode_is_known(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().replace('-', "_").as_str(),
        "ai_style" | "style" | "ai"
    )
}

/// One stakeholder's unit of work. Built by the planner, consumed once.
#[derive(Clone, Debug)]
pub struct GenerationTask {
    pub id: TaskId,
    pub stakeholder: Stakeholder,
    pub company_name: String,
    pub company_summary: Arc<CompanySummary>,
    pub relevant_context: String,
    pub generation_mode: GenerationMode,
    pub mode_config: ModeConfig,
    pub caller: Option<String>,
}

impl GenerationTask {
    /// The mode is taken from the config so the two can never disagree.
    pub fn new(
        stakeholder: Stakeholder,
        company_name: impl Into<String>,
        company_summary: Arc<CompanySummary>,
        relevant_context: impl Into<String>,
        mode_config: ModeConfig,
        caller: Option<String>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            stakeholder,
            company_name: company_name.into(),
            company_summary,
            relevant_context: relevant_context.into(),
            generation_mode: mode_config.mode(),
            mode_config,
            caller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_name_skips_honorific() {
        let s = Stakeholder::new("Dr. Jane Smith", "CTO", "");
        assert_eq!(s.first_name(), "Jane");
        let s = Stakeholder::new("Michael Chen", "VP of Product", "");
        assert_eq!(s.first_name(), "Michael");
    }

    #[test]
    fn first_name_keeps_lone_honorific_like_token() {
        let s = Stakeholder::new("Dr.", "CMO", "");
        assert_eq!(s.first_name(), "Dr.");
        assert_eq!(Stakeholder::new("", "CMO", "").first_name(), "");
    }

    #[test]
    fn stakeholder_details_default_when_absent() {
        let s: Stakeholder = serde_json::from_value(json!({"name": "A", "title": "B"})).unwrap();
        assert_eq!(s.details, "");
        assert!(s.is_complete());
    }

    #[test]
    fn stakeholder_null_fields_read_as_empty() {
        let s: Stakeholder =
            serde_json::from_value(json!({"name": "Dr. Jane Smith", "title": "CTO", "details": null})).unwrap();
        assert_eq!(s.details, "");
        assert!(s.is_complete());

        let s: Stakeholder = serde_json::from_value(json!({"name": null, "title": "CTO"})).unwrap();
        assert!(!s.is_complete());
    }

    #[test]
    fn mode_parse_known_and_unknown() {
        assert_eq!(GenerationMode::parse_lenient("template"), GenerationMode::Template);
        assert_eq!(GenerationMode::parse_lenient(" Custom "), GenerationMode::Custom);
        assert_eq!(GenerationMode::parse_lenient("ai-style"), GenerationMode::AiStyle);
        assert_eq!(GenerationMode::parse_lenient("bogus"), GenerationMode::AiStyle);
        assert_eq!("bogus".parse::<GenerationMode>().unwrap(), GenerationMode::AiStyle);
    }

    #[test]
    fn unknown_mode_ignores_config_and_uses_default_style() {
        let cfg = ModeConfig::from_loose("bogus", &json!({"style_key": "casual_broy"}));
        assert_eq!(cfg, ModeConfig::AiStyle { style_key: None });
        assert_eq!(cfg, ModeConfig::from_loose("ai_style", &json!({})));
    }

    #[test]
    fn loose_template_sources() {
        let raw = ModeConfig::from_loose("template", &json!({"promptTemplate": "Write {stakeholder_name}"}));
        assert!(matches!(raw, ModeConfig::Template(TemplateSource::RawPrompt { .. })));

        let stored = ModeConfig::from_loose("template", &json!({"templateId": 7, "userFields": {"sender": "Ana"}}));
        let ModeConfig::Template(TemplateSource::Stored { template_id, user_fields }) = stored else {
            panic!("expected stored template");
        };
        assert_eq!(template_id, 7);
        assert_eq!(user_fields.get("sender").map(String::as_str), Some("Ana"));

        let built_in = ModeConfig::from_loose(
            "template",
            &json!({"template_key": "casual_broy", "user_fields": {"subject": "hi", "n": 3}}),
        );
        let ModeConfig::Template(TemplateSource::BuiltIn { template_key, user_fields }) = built_in else {
            panic!("expected built-in template");
        };
        assert_eq!(template_key, "casual_broy");
        assert_eq!(user_fields.len(), 1);
    }

    #[test]
    fn loose_custom_reads_instructions() {
        let cfg = ModeConfig::from_loose("custom", &json!({"custom_instructions": "Be brief."}));
        assert_eq!(cfg, ModeConfig::Custom { instructions: "Be brief.".into() });
        assert_eq!(cfg.mode(), GenerationMode::Custom);
    }

    #[test]
    fn company_name_from_colon_heading() {
        let summary = CompanySummary::new("TechCorp Solutions: A mid-sized SaaS company.\n\nMore text.");
        assert_eq!(summary.company_name(), "TechCorp Solutions");
    }

    #[test]
    fn company_name_from_leading_subject() {
        let summary = CompanySummary::new("Riverside General Hospital is a 450-bed teaching hospital.");
        assert_eq!(summary.company_name(), "Riverside General Hospital");
    }

    #[test]
    fn company_name_falls_back() {
        let summary = CompanySummary::new("The report covers several regional trends in care delivery and staffing.");
        assert_eq!(summary.company_name(), UNKNOWN_COMPANY);
    }

    #[test]
    fn task_mode_follows_config() {
        let task = GenerationTask::new(
            Stakeholder::new("Jane", "CMO", ""),
            "Acme",
            Arc::new(CompanySummary::new("Acme is a hospital.")),
            "",
            ModeConfig::Custom { instructions: "x".into() },
            None,
        );
        assert_eq!(task.generation_mode, GenerationMode::Custom);
    }
}

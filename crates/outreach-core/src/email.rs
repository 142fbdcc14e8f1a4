use serde::{Deserialize, Deserializer, Serialize};

use crate::json::{recover_json, JsonRecoveryError, JsonShape};
use crate::task::{GenerationMode, Stakeholder};

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("draft has no subject")]
    MissingSubject,
    #[error("draft has no body")]
    MissingBody,
    #[error(transparent)]
    Json(#[from] JsonRecoveryError),
}

/// A candidate email. Both fields are guaranteed non-blank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmailDraft {
    subject: String,
    body: String,
}

#[derive(Deserialize)]
struct RawDraft {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

impl EmailDraft {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Result<Self, DraftError> {
        let subject = subject.into().trim().to_string();
        let body = body.into().trim().to_string();
        if subject.is_empty() {
            return Err(DraftError::MissingSubject);
        }
        if body.is_empty() {
            return Err(DraftError::MissingBody);
        }
        Ok(Self { subject, body })
    }

    /// Parse a `{subject, body}` object out of raw model output.
    pub fn from_model_output(raw: &str) -> Result<Self, DraftError> {
        let parsed: RawDraft = recover_json(raw, JsonShape::Object)?;
        Self::new(parsed.subject.unwrap_or_default(), parsed.body.unwrap_or_default())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Rubric dimensions, in the order they are reported.
pub const RUBRIC_DIMENSIONS: [&str; 7] = [
    "brevity",
    "hospital_specific_evidence",
    "healthcare_language",
    "directness",
    "data_driven",
    "clear_cta",
    "role_relevance",
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RubricScores {
    #[serde(deserialize_with = "score")]
    pub brevity: f64,
    #[serde(deserialize_with = "score")]
    pub hospital_specific_evidence: f64,
    #[serde(deserialize_with = "score")]
    pub healthcare_language: f64,
    #[serde(deserialize_with = "score")]
    pub directness: f64,
    #[serde(deserialize_with = "score")]
    pub data_driven: f64,
    #[serde(deserialize_with = "score")]
    pub clear_cta: f64,
    #[serde(deserialize_with = "score")]
    pub role_relevance: f64,
}

impl RubricScores {
    pub fn uniform(value: f64) -> Self {
        Self::from_array([value; 7])
    }

    pub fn from_array(s: [f64; 7]) -> Self {
        Self {
            brevity: s[0].clamp(0.0, 10.0),
            hospital_specific_evidence: s[1].clamp(0.0, 10.0),
            healthcare_language: s[2].clamp(0.0, 10.0),
            directness: s[3].clamp(0.0, 10.0),
            data_driven: s[4].clamp(0.0, 10.0),
            clear_cta: s[5].clamp(0.0, 10.0),
            role_relevance: s[6].clamp(0.0, 10.0),
        }
    }

    pub fn as_array(&self) -> [f64; 7] {
        [
            self.brevity,
            self.hospital_specific_evidence,
            self.healthcare_language,
            self.directness,
            self.data_driven,
            self.clear_cta,
            self.role_relevance,
        ]
    }

    pub fn mean(&self) -> f64 {
        self.as_array().iter().sum::<f64>() / RUBRIC_DIMENSIONS.len() as f64
    }
}

// Scores may arrive as numbers or numeric strings ("8"). Values outside the
// 0-10 scale are clamped; non-finite ones are rejected.
fn score<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }
    let value = match NumberOrText::deserialize(d)? {
        NumberOrText::Number(n) => n,
        NumberOrText::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("score {s:?} is not a number")))?,
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom("score must be finite"));
    }
    Ok(value.clamp(0.0, 10.0))
}

fn text_or_list<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrList {
        Text(String),
        List(Vec<String>),
    }
    Ok(match Option::<TextOrList>::deserialize(d)? {
        Some(TextOrList::Text(s)) => s,
        Some(TextOrList::List(items)) => items.join(" "),
        None => String::new(),
    })
}

/// Rubric report for one draft. Any `overall_score` the model volunteers is
/// ignored; [`Evaluation::overall_score`] is always the mean of the seven
/// sub-scores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(flatten)]
    pub scores: RubricScores,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub improvement_suggestions: String,
}

impl Evaluation {
    pub fn from_model_output(raw: &str) -> Result<Self, JsonRecoveryError> {
        recover_json(raw, JsonShape::Object)
    }

    pub fn overall_score(&self) -> f64 {
        self.scores.mean()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Scored at or above threshold on the first draft.
    Accepted,
    /// Scored below threshold with refinement disabled.
    BelowThreshold,
    Refined,
    RefinementFailed,
    EvaluationFailed,
    DraftFailed,
}

pub const ERROR_SUBJECT: &str = "ERROR";

/// Final output for one stakeholder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub stakeholder_name: String,
    pub stakeholder_title: String,
    pub subject: String,
    pub body: String,
    pub quality_score: f64,
    pub reflection_notes: String,
    pub generation_mode: GenerationMode,
    pub outcome: RecordOutcome,
}

impl EmailRecord {
    pub fn finalized(
        stakeholder: &Stakeholder,
        draft: EmailDraft,
        quality_score: f64,
        reflection_notes: impl Into<String>,
        generation_mode: GenerationMode,
        outcome: RecordOutcome,
    ) -> Self {
        Self {
            stakeholder_name: stakeholder.name.clone(),
            stakeholder_title: stakeholder.title.clone(),
            subject: draft.subject,
            body: draft.body,
            quality_score,
            reflection_notes: reflection_notes.into(),
            generation_mode,
            outcome,
        }
    }

    /// Terminal record for a stakeholder whose draft could not be produced.
    pub fn failed(stakeholder: &Stakeholder, generation_mode: GenerationMode, reason: &str) -> Self {
        Self {
            stakeholder_name: stakeholder.name.clone(),
            stakeholder_title: stakeholder.title.clone(),
            subject: ERROR_SUBJECT.to_string(),
            body: format!("Failed to generate email: {reason}"),
            quality_score: 0.0,
            reflection_notes: reason.to_string(),
            generation_mode,
            outcome: RecordOutcome::DraftFailed,
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome == RecordOutcome::DraftFailed
    }

    pub fn meets(&self, threshold: f64) -> bool {
        !self.is_error() && self.quality_score >= threshold
    }
}

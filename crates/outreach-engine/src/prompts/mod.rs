//! Prompt text and catalogs. Everything here is static data plus the small
//! amount of logic needed to pick an entry.

pub mod custom;
pub mod research;
pub mod review;
pub mod styles;
pub mod templates;

/// System framing per call kind.
pub mod system {
    pub const AI_STYLE: &str = "You are a professional email writer specializing in personalized outreach.";
    pub const TEMPLATE: &str = "You are an expert at generating contextual email content.";
    pub const CUSTOM: &str = "You are a professional email writer following custom user instructions.";
    pub const EVALUATION: &str = "You are an expert email quality reviewer.";
    pub const REFINEMENT: &str = "You are a professional email writer specializing in refinement.";
    pub const RESEARCH: &str = "You are an expert research analyst.";
}

/// Shared engagement guidance; expands to a string literal so catalogs can
/// splice it in with `concat!`.
macro_rules! engagement_suggestions {
    () => {
        "**KEY STAKEHOLDER ENGAGEMENT SUGGESTIONS:**
If the research report includes engagement recommendations for this stakeholder (preferred communication style, decision triggers, pain points, priorities), REVIEW and INCORPORATE them:
- Adjust tone/approach based on their communication preferences (data-driven, relationship-focused, urgency-driven)
- Frame value proposition around their specific decision criteria
- Reference pain points or priorities mentioned in engagement suggestions
- Tailor subject line and messaging to match their engagement triggers (curiosity, urgency, peer validation)
"
    };
}

/// Stakeholder and organization block used by the fixed styles.
macro_rules! style_context {
    () => {
        "**Product Context (IntelliSep Sepsis Test):**
{product_report_excerpt}

**Stakeholder Information:**
Name: {stakeholder_name}
Title: {stakeholder_title}
Role Details: {stakeholder_details}

**Role-Specific Context:**
{role_context_excerpt}

**Hospital Context:**
Hospital: {company_name}
Report Summary: {company_summary}

**Specific Insights from Hospital Report:**
{relevant_context}

"
    };
}

/// Closing instruction for calls that must answer with a `{subject, body}`.
macro_rules! email_json_footer {
    ($subject_hint:literal, $body_hint:literal) => {
        concat!(
            "Format as JSON:\n{\n    \"subject\": \"",
            $subject_hint,
            "\",\n    \"body\": \"",
            $body_hint,
            "\"\n}\n\nReturn ONLY the JSON, no additional text."
        )
    };
}

pub(crate) use email_json_footer;
pub(crate) use engagement_suggestions;
pub(crate) use style_context;

//! Fixed AI-authored email styles.

use outreach_core::prompt::PromptTemplate;
use tracing::warn;

use super::{email_json_footer, engagement_suggestions, style_context};

pub const DEFAULT_STYLE_KEY: &str = "technical_direct";

/// Every style prompt must be rendered with all of these.
pub const STYLE_PLACEHOLDERS: &[&str] = &[
    "product_report_excerpt",
    "stakeholder_name",
    "stakeholder_title",
    "stakeholder_details",
    "role_context_excerpt",
    "company_name",
    "company_summary",
    "relevant_context",
];

#[derive(Clone, Copy, Debug)]
pub struct Style {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt: PromptTemplate<'static>,
}

const fn entry(
    key: &'static str,
    name: &'static str,
    description: &'static str,
    text: &'static str,
) -> Style {
    Style {
        key,
        name,
        description,
        prompt: PromptTemplate::new(key, text, STYLE_PLACEHOLDERS),
    }
}

pub const STYLES: &[Style] = &[
    entry(
        "healthcare_professional",
        "Healthcare Professional",
        "Formal, clinically grounded cold email that respects the reader's expertise",
        concat!(
            "You are writing a professional cold email to a healthcare leader. Be respectful, clinical and specific.

**CRITICAL COLD EMAIL RULES:**
- Maximum 150 words
- Open with a specific clinical or quality finding from the hospital report
- Use \"patients\" NOT \"customers\"
- Include 1-2 concrete IntelliSep metrics
- Close with a low-commitment ask

**Email Structure:**
1. **Clinical Hook (1 sentence)**: A specific finding from their report
2. **Relevance (2-3 sentences)**: Why IntelliSep matters for that finding
3. **Call to Action (1 sentence)**: A brief conversation with a proposed timeframe

",
            style_context!(),
            engagement_suggestions!(),
            "
Generate a professional cold email. ",
            email_json_footer!(
                "Specific clinical subject (under 60 characters)",
                "Email body (under 150 words)"
            )
        ),
    ),
    entry(
        "casual_broy",
        "Casual Bro-y",
        "Short, lowercase, peer-to-peer note that gets straight to the problem",
        concat!(
            "You are writing a casual, direct cold email. Sound like a peer, not a vendor. Lowercase is fine.

**CRITICAL COLD EMAIL RULES:**
- Maximum 100 words
- First line names their biggest problem from the hospital report
- Use \"patients\" NOT \"customers\"
- No corporate filler, no exclamation marks
- End with a one-line ask

",
            style_context!(),
            engagement_suggestions!(),
            "
Generate a casual, punchy cold email. ",
            email_json_footer!(
                "lowercase problem statement (under 40 characters)",
                "Email body (under 100 words)"
            )
        ),
    ),
    entry(
        "technical_direct",
        "Technical and Data-Driven",
        "Concise, specification-focused cold email with clinical data",
        concat!(
            "You are writing a technical cold email to a healthcare professional who values data and specifics. Be precise and evidence-based.

**CRITICAL COLD EMAIL RULES:**
- Maximum 150 words
- Lead with a specific clinical or operational metric from the report
- Use precise clinical terminology
- Include 2-3 specific IntelliSep performance metrics
- Use \"patients\" NOT \"customers\"
- Focus on measurable outcomes
- Clear, simple call to action

**HOSPITAL-SPECIFIC EVIDENCE REQUIREMENT:**
You MUST reference SPECIFIC quantitative data from the hospital research report:
- Exact SEP-1 scores, sepsis bundle compliance percentages
- Mortality rates, readmission rates, or length of stay data
- Lab turnaround times or diagnostic delays
- ED throughput metrics or patient volumes
- Specific performance gaps vs. benchmarks

**Email Structure:**
1. **Data Hook (1 sentence)**: Reference a SPECIFIC metric or clinical challenge from their report
2. **Technical Solution (3-4 sentences)**: IntelliSep's clinical performance with specific data
3. **Call to Action (1 sentence)**: Offer to share detailed data or validation studies

",
            style_context!(),
            engagement_suggestions!(),
            "
Generate a technical, data-driven cold email. ",
            email_json_footer!(
                "Metric-led subject (under 60 characters)",
                "Email body (under 150 words)"
            )
        ),
    ),
    entry(
        "executive_brief",
        "Executive Brief",
        "Strategic, outcome-focused summary for C-suite readers",
        concat!(
            "You are writing a cold email to a hospital executive. Frame everything in terms of strategic outcomes: quality ratings, financial exposure, patient outcomes.

**CRITICAL COLD EMAIL RULES:**
- Maximum 120 words
- Lead with one organization-level risk or goal from the report
- Quantify impact (penalties avoided, mortality reduced, length of stay)
- Use \"patients\" NOT \"customers\"
- Ask for a 15-minute briefing

",
            style_context!(),
            engagement_suggestions!(),
            "
Generate an executive-level cold email. ",
            email_json_footer!(
                "Outcome-focused subject (under 50 characters)",
                "Email body (under 120 words)"
            )
        ),
    ),
    entry(
        "consultative",
        "Consultative",
        "Question-led email that positions the sender as a helpful advisor",
        concat!(
            "You are writing a consultative cold email. Open with an insight or question drawn from the report and position IntelliSep as one way to address it.

**CRITICAL COLD EMAIL RULES:**
- Maximum 150 words
- Open with a thoughtful question tied to a specific report finding
- Offer one relevant observation from similar hospitals
- Use \"patients\" NOT \"customers\"
- Suggest a collaborative working session

",
            style_context!(),
            engagement_suggestions!(),
            "
Generate a consultative cold email. ",
            email_json_footer!(
                "Question-style subject (under 60 characters)",
                "Email body (under 150 words)"
            )
        ),
    ),
    entry(
        "direct_urgent",
        "Direct and Urgent",
        "Problem-first email that conveys the cost of delay",
        concat!(
            "You are writing a direct, urgent cold email. Every hour of delayed sepsis diagnosis matters; make that concrete.

**HOSPITAL-SPECIFIC EVIDENCE REQUIREMENT:**
You MUST lead with a SPECIFIC fact from the hospital research report:
- SEP-1 compliance gaps or sepsis mortality data
- Quality measure scores that need improvement
- CMS star rating changes or quality penalties
- Specific operational challenges (ED overcrowding, lab delays, etc.)

**Email Structure:**
1. **Problem Hook (1 sentence)**: State the SPECIFIC challenge from their report with a concrete fact
2. **Solution + Proof (2-3 sentences)**: IntelliSep's impact with real data
3. **Call to Action (1 sentence)**: Simple next step with timeframe

",
            style_context!(),
            engagement_suggestions!(),
            "
Keep it under 120 words. Generate a direct, urgent cold email. ",
            email_json_footer!(
                "Direct problem statement with specific metric (under 50 characters)",
                "Email body (under 120 words)"
            )
        ),
    ),
];

pub fn style(key: &str) -> Option<&'static Style> {
    STYLES.iter().find(|s| s.key == key)
}

/// Resolve a caller-supplied key, falling back to `default_key` (and then
/// to [`DEFAULT_STYLE_KEY`]) with a warning when it is unknown.
pub fn resolve(key: Option<&str>, default_key: &str) -> &'static Style {
    if let Some(found) = key.and_then(style) {
        return found;
    }
    if let Some(requested) = key {
        warn!(style = requested, fallback = default_key, "unknown style key");
    }
    style(default_key)
        .or_else(|| style(DEFAULT_STYLE_KEY))
        .unwrap_or(&STYLES[2])
}

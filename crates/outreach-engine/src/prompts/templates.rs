//! Built-in editable templates: user fields, AI-filled slots and the fixed
//! skeletons the two are assembled into.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use outreach_core::email::{DraftError, EmailDraft};
use outreach_core::task::Stakeholder;

use super::engagement_suggestions;

#[derive(Clone, Copy, Debug)]
pub struct BuiltInTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Field name and the hint shown to the user, in display order.
    pub user_fields: &'static [(&'static str, &'static str)],
    /// Human-readable outline of the finished email.
    pub structure: &'static str,
    /// Prompt asking the model for the AI slots only.
    pub prompt: &'static str,
    pub ai_slots: &'static [&'static str],
}

impl BuiltInTemplate {
    /// User fields with missing entries filled from their hints.
    pub fn fields_with_hints(&self, given: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut fields = given.clone();
        for (name, hint) in self.user_fields {
            let entry = fields.entry((*name).to_string()).or_default();
            if entry.trim().is_empty() {
                *entry = (*hint).to_string();
            }
        }
        fields
    }
}

macro_rules! stakeholder_block {
    () => {
        "Stakeholder Information:
Name: {stakeholder_name}
Title: {stakeholder_title}
Background: {stakeholder_details}

Company Context:
Company: {company_name}
Summary: {company_summary}

Relevant Research Insights:
{relevant_context}

"
    };
}

pub const TEMPLATES: &[BuiltInTemplate] = &[
    BuiltInTemplate {
        key: "problem_solution",
        name: "Problem-Solution",
        description: "Focus on specific challenges and your solution",
        user_fields: &[
            ("subject", "Your compelling subject about their specific challenge"),
            ("opening", "Opening that demonstrates understanding"),
            ("benefit_1", "Key benefit 1"),
            ("benefit_2", "Key benefit 2"),
            ("benefit_3", "Key benefit 3"),
            ("call_to_action", "Your specific ask"),
            ("closing", "Your closing and signature"),
        ],
        structure: "Subject: {subject}

{stakeholder_name},

{opening}

Here's what we're seeing at similar organizations:
[AI_CONTEXT: Pain points and challenges from research]

What if you could:
- {benefit_1}
- {benefit_2}
- {benefit_3}

[AI_CONTEXT: How this specifically applies to their role and organization]

{call_to_action}

{closing}",
        prompt: concat!(
            "You are filling in the AI-generated context sections of a cold email template for healthcare outreach.

**CRITICAL: Use healthcare-appropriate language. Say \"patients\" NOT \"customers\". Reference specific challenges from the hospital report.**

User has provided:
- Subject: {subject}
- Opening: {opening}
- Benefits: {benefit_1}, {benefit_2}, {benefit_3}
- Call to Action: {call_to_action}
- Closing: {closing}

Your task: Generate the two [AI_CONTEXT] sections:

1. \"Here's what we're seeing at similar hospitals:\"
   - Extract 2-3 SPECIFIC challenges from the hospital report
   - Use clinical/operational terminology (sepsis metrics, patient outcomes, TAT, etc.)
   - Reference actual data or situations from the report
   - 2-3 sentences, direct and specific

2. \"How this specifically applies to their role and organization:\"
   - Connect the user's benefits to SPECIFIC initiatives or challenges from the report
   - Reference their exact role and priorities
   - 2-3 sentences

",
            stakeholder_block!(),
            engagement_suggestions!(),
            "
Generate the AI context sections using healthcare-appropriate language. Format as JSON:
{
    \"pain_points_section\": \"Text for 'Here's what we're seeing...' (specific to their hospital)\",
    \"application_section\": \"Text for 'How this specifically applies...' (reference report insights)\"
}

Return ONLY the JSON, no additional text."
        ),
        ai_slots: &["pain_points_section", "application_section"],
    },
    BuiltInTemplate {
        key: "casual_broy",
        name: "Casual Bro-y Template",
        description: "Direct, problem-focused casual style",
        user_fields: &[
            ("subject", "direct problem statement"),
            ("your_achievement", "What you implemented/achieved"),
            ("your_solution", "Your solution description in plain language"),
            ("timeframe", "Timeframe (e.g., '60 days', '2 weeks')"),
        ],
        structure: "Subject: {subject}

{stakeholder_first_name}

[AI_CONTEXT: Their biggest pain point]

{your_achievement}

here's what they're actually struggling with:

[AI_CONTEXT: 3-4 specific pain points as bullets]

{your_solution}

[AI_CONTEXT: Specific application to their situation]

{timeframe}. ready to talk?",
        prompt: concat!(
            "You are filling in the AI-generated context sections of a direct, urgent cold email template for healthcare outreach.

**CRITICAL: Use healthcare language. Say \"patients\" NOT \"customers\". Reference SPECIFIC challenges from the hospital report.**

User has provided:
- Subject: {subject}
- Achievement: {your_achievement}
- Solution: {your_solution}
- Timeframe: {timeframe}

Your task: Generate the three [AI_CONTEXT] sections in a direct, urgent style:

1. Opening pain point (1-2 sentences):
   - Their single biggest challenge from the hospital report
   - Make it specific with data if available (metrics, timelines, volumes)

2. Bullet list of struggles (3-4 bullets):
   - SPECIFIC challenges from the hospital report
   - Use actual numbers/details from the report
   - Clinical/operational focus (patient outcomes, TAT, compliance, etc.)

3. Application to their situation (2-3 sentences):
   - How the solution addresses their specific report findings
   - Connect to their exact role and priorities
   - Make the impact concrete and measurable

",
            stakeholder_block!(),
            engagement_suggestions!(),
            "
Generate the AI context sections using healthcare-appropriate language. Format as JSON:
{
    \"opening_pain\": \"Their biggest challenge from the report (specific)\",
    \"struggle_bullets\": [\"specific challenge 1 with data\", \"specific challenge 2\", \"specific challenge 3\", \"specific challenge 4\"],
    \"application\": \"How solution applies to their specific situation\"
}

Return ONLY the JSON, no additional text."
        ),
        ai_slots: &["opening_pain", "struggle_bullets", "application"],
    },
    BuiltInTemplate {
        key: "partnership",
        name: "Partnership Proposal",
        description: "Collaborative partnership opportunity",
        user_fields: &[
            ("subject", "Partnership opportunity subject"),
            ("partnership_vision", "Your vision for the partnership"),
            ("mutual_value_1", "Value point 1"),
            ("mutual_value_2", "Value point 2"),
            ("mutual_value_3", "Value point 3"),
            ("next_step", "Proposed next step"),
            ("closing", "Closing and signature"),
        ],
        structure: "Subject: {subject}

{stakeholder_name},

[AI_CONTEXT: Recognition of their work and strategic position]

{partnership_vision}

I see potential for mutual value in several areas:
- {mutual_value_1}
- {mutual_value_2}
- {mutual_value_3}

[AI_CONTEXT: How partnership aligns with their current initiatives]

{next_step}

{closing}",
        prompt: concat!(
            "You are filling in the AI-generated context sections of a consultative cold email template for healthcare outreach.

**CRITICAL: Use healthcare language. Say \"patients\" NOT \"customers\". Reference SPECIFIC initiatives or challenges from the hospital report.**

User has provided:
- Subject: {subject}
- Partnership Vision: {partnership_vision}
- Value Points: {mutual_value_1}, {mutual_value_2}, {mutual_value_3}
- Next Step: {next_step}
- Closing: {closing}

Your task: Generate the two [AI_CONTEXT] sections:

1. Recognition of their work (2-3 sentences):
   - Acknowledge SPECIFIC initiatives, challenges, or priorities from the hospital report
   - Professional, respectful tone

2. Partnership alignment (2-3 sentences):
   - Connect the partnership vision to SPECIFIC findings from the report
   - Show how collaboration addresses their specific situation

",
            stakeholder_block!(),
            engagement_suggestions!(),
            "
Generate the AI context sections using healthcare-appropriate language. Format as JSON:
{
    \"recognition_section\": \"Recognition of their specific work/initiatives from report\",
    \"alignment_section\": \"Partnership alignment with their specific challenges/goals\"
}

Return ONLY the JSON, no additional text."
        ),
        ai_slots: &["recognition_section", "alignment_section"],
    },
];

pub fn template(key: &str) -> Option<&'static BuiltInTemplate> {
    TEMPLATES.iter().find(|t| t.key == key)
}

/// The three skeleton shapes assembly knows how to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Skeleton {
    Casual,
    Partnership,
    ProblemSolution,
}

impl Skeleton {
    /// Match on the normalized display name (lowercased, whitespace runs
    /// collapsed to `_`). Unrecognized names get the problem-solution shape.
    pub fn for_name(name: &str) -> Self {
        let normalized = normalize_name(name);
        if normalized.contains("casual") || normalized.contains("broy") {
            Self::Casual
        } else if normalized.contains("partnership") {
            Self::Partnership
        } else {
            Self::ProblemSolution
        }
    }
}

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// AI slot values as returned by the model.
#[derive(Clone, Debug, Default)]
pub struct AiSections(Map<String, Value>);

impl AiSections {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn text(&self, slot: &str) -> String {
        match self.0.get(slot) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            _ => String::new(),
        }
    }

    /// List slot; a plain string is split into one entry per non-empty line
    /// with any leading bullet marker removed.
    pub fn list(&self, slot: &str) -> Vec<String> {
        match self.0.get(slot) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .lines()
                .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Interpolate user fields and AI slots into the skeleton for `template`.
/// Missing values render empty; the subject is the user's `subject` field.
pub fn assemble(
    template: &BuiltInTemplate,
    user_fields: &BTreeMap<String, String>,
    sections: &AiSections,
    stakeholder: &Stakeholder,
) -> Result<EmailDraft, DraftError> {
    let field = |name: &str| user_fields.get(name).map(String::as_str).unwrap_or("").trim();

    let body = match Skeleton::for_name(template.name) {
        Skeleton::Casual => {
            let bullets = sections
                .list("struggle_bullets")
                .iter()
                .map(|b| format!("- {b}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{first}\n\n{opening}\n\n{achievement}\n\nhere's what they're actually struggling with:\n\n{bullets}\n\n{solution}\n\n{application}\n\n{timeframe}. ready to talk?",
                first = stakeholder.first_name(),
                opening = sections.text("opening_pain"),
                achievement = field("your_achievement"),
                solution = field("your_solution"),
                application = sections.text("application"),
                timeframe = field("timeframe"),
            )
        }
        Skeleton::Partnership => format!(
            "{name},\n\n{recognition}\n\n{vision}\n\nI see potential for mutual value in several areas:\n- {v1}\n- {v2}\n- {v3}\n\n{alignment}\n\n{next}\n\n{closing}",
            name = stakeholder.name,
            recognition = sections.text("recognition_section"),
            vision = field("partnership_vision"),
            v1 = field("mutual_value_1"),
            v2 = field("mutual_value_2"),
            v3 = field("mutual_value_3"),
            alignment = sections.text("alignment_section"),
            next = field("next_step"),
            closing = field("closing"),
        ),
        Skeleton::ProblemSolution => format!(
            "{name},\n\n{opening}\n\nHere's what we're seeing at similar organizations:\n{pain}\n\nWhat if you could:\n- {b1}\n- {b2}\n- {b3}\n\n{application}\n\n{cta}\n\n{closing}",
            name = stakeholder.name,
            opening = field("opening"),
            pain = sections.text("pain_points_section"),
            b1 = field("benefit_1"),
            b2 = field("benefit_2"),
            b3 = field("benefit_3"),
            application = sections.text("application_section"),
            cta = field("call_to_action"),
            closing = field("closing"),
        ),
    };

    EmailDraft::new(field("subject"), body)
}

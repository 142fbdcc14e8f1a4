use outreach_core::prompt::PromptTemplate;

use super::{email_json_footer, engagement_suggestions};

pub const MIN_INSTRUCTION_CHARS: usize = 20;
pub const MAX_INSTRUCTION_CHARS: usize = 2000;

pub const DEFAULT_INSTRUCTIONS: &str = "Write a professional email introducing our solution. Keep it concise and focused on their specific challenges.";

pub const CUSTOM_PROMPT: PromptTemplate<'static> = PromptTemplate::new(
    "custom",
    concat!(
        "You are generating a cold email for healthcare outreach based on custom user instructions.

**CRITICAL REQUIREMENTS (apply to ALL custom emails):**
1. **Healthcare Language**: Use \"patients\" NOT \"customers\" - this is healthcare, not retail
2. **Report Specificity**: Reference SPECIFIC challenges, metrics, or opportunities from the hospital report
3. **Brevity**: Keep under 150 words unless user explicitly requests longer
4. **Directness**: Get to the point quickly, no preamble
5. **Data-Driven**: Include specific metrics when relevant
6. **Clear CTA**: Simple, actionable next step

**Stakeholder Information:**
Name: {stakeholder_name}
Title: {stakeholder_title}
Role Details: {stakeholder_details}

**Hospital Context:**
Hospital: {company_name}
Report Summary: {company_summary}

**Specific Insights from Hospital Report:**
{relevant_context}

",
        engagement_suggestions!(),
        "
**User's Custom Instructions:**
{custom_instructions}

**Instructions:**
1. Follow the user's custom instructions above
2. MUST use healthcare-appropriate language (patients, clinical outcomes, quality metrics)
3. MUST reference specific insights from the hospital report
4. Use the stakeholder's role and priorities to personalize
5. Keep it concise and direct (cold email best practices)

Generate an email following the user's custom instructions while adhering to the critical requirements. ",
        email_json_footer!("Email subject line", "Email body")
    ),
    &[
        "stakeholder_name",
        "stakeholder_title",
        "stakeholder_details",
        "company_name",
        "company_summary",
        "relevant_context",
        "custom_instructions",
    ],
);

pub const EXAMPLES: [&str; 3] = [
    "You are a senior account executive at a sepsis diagnostics company. Write an email that:
1. Opens with a specific reference to their hospital's latest SEP-1 compliance score
2. Mentions the challenge of early sepsis recognition in a crowded ED
3. Positions IntelliSep as a way to rule out sepsis in under 10 minutes
4. Uses a professional but warm tone
5. Ends with an invitation to a 20-minute clinical deep-dive call

Keep it under 200 words.",
    "Write an email in the style of a clinical peer reaching out for a collaboration discussion.
- Reference their published work on sepsis bundles
- Mention you saw their team is expanding the rapid response program
- Suggest our host-response test could help them triage faster
- Use clinical language but keep it conversational
- Propose a short working session with their quality team

Length: 150-200 words.",
    "Casual, peer-to-peer email:
- Start with \"saw the new ED expansion - congrats\"
- Mention the challenge of sepsis workups eating into throughput
- Share that we helped 3 similar hospitals cut time-to-antibiotics by 40%
- Very brief, very direct
- End with \"15 min call this week?\"

Max 100 words, super casual.",
];

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InstructionError {
    #[error("custom prompt cannot be empty")]
    Empty,
    #[error("custom prompt is too short (minimum {MIN_INSTRUCTION_CHARS} characters)")]
    TooShort,
    #[error("custom prompt is too long (maximum {MAX_INSTRUCTION_CHARS} characters)")]
    TooLong,
}

pub fn validate_instructions(instructions: &str) -> Result<(), InstructionError> {
    let trimmed = instructions.trim();
    if trimmed.is_empty() {
        return Err(InstructionError::Empty);
    }
    if trimmed.chars().count() < MIN_INSTRUCTION_CHARS {
        return Err(InstructionError::TooShort);
    }
    if instructions.chars().count() > MAX_INSTRUCTION_CHARS {
        return Err(InstructionError::TooLong);
    }
    Ok(())
}

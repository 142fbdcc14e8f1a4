//! Prompts that read the research report: roster, summary and
//! per-stakeholder context.

use outreach_core::prompt::PromptTemplate;

pub const STAKEHOLDER_EXTRACTION_PROMPT: PromptTemplate<'static> = PromptTemplate::new(
    "stakeholder_extraction",
    "Your task is to analyze a research report about a customer/company and identify the key stakeholders mentioned in the report.

Read and analyze the entire report carefully.

For each stakeholder, extract:
1. Full name
2. Job title/role
3. Key responsibilities or areas of focus
4. Relevant information that would be useful for personalized outreach

Format your response as a JSON array of stakeholder objects:
[
  {
    \"name\": \"Full Name\",
    \"title\": \"Job Title\",
    \"details\": \"Key information about this person and their role...\"
  }
]

IMPORTANT: Return ONLY the raw JSON array. Do not wrap it in markdown code blocks or add any explanatory text.

Research Report:
{report}",
    &["report"],
);

pub const COMPANY_SUMMARY_PROMPT: PromptTemplate<'static> = PromptTemplate::new(
    "company_summary",
    "Your task is to extract a concise summary of the company/customer from the research report that can be used as context for email outreach.

Read and analyze the entire report carefully.

Focus on:
- Company name and industry
- Key products/services
- Strategic priorities
- Recent developments or challenges
- Market position and competitive landscape

Provide a 2-3 paragraph summary that captures the essential information about this company. Begin with the organization's name. Write in a clear, professional tone suitable for use in business communications.

Research Report:
{report}",
    &["report"],
);

pub const CONTEXT_EXTRACTION_PROMPT: PromptTemplate<'static> = PromptTemplate::new(
    "context_extraction",
    "Your task is to extract relevant information from a research report that pertains to a specific stakeholder.

Given a stakeholder's name, title, and role, identify and extract all relevant sections from the research report that would be useful for crafting a personalized email to this person.

Focus on:
- Information directly related to their responsibilities
- Projects or initiatives they are involved in
- Challenges or opportunities in their area
- Recent achievements or developments
- Any quotes or mentions of this person

Stakeholder Information:
Name: {stakeholder_name}
Title: {stakeholder_title}
Details: {stakeholder_details}

Research Report:
{report}

Extract and return the relevant excerpts. If the stakeholder is not mentioned directly, extract information related to their role and responsibilities. Keep the extracted content concise but informative (2-4 paragraphs maximum).",
    &["stakeholder_name", "stakeholder_title", "stakeholder_details", "report"],
);

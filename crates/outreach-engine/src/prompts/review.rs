//! Evaluation and refinement prompts for the review loop.

use outreach_core::prompt::PromptTemplate;

use super::email_json_footer;

pub const EVALUATION_PROMPT: PromptTemplate<'static> = PromptTemplate::new(
    "evaluation",
    "You are an expert cold email quality reviewer. Evaluate this email against cold email best practices for healthcare outreach.

Email to Evaluate:
Subject: {subject}
Body: {body}

Intended Style: {email_style}

**Cold Email Evaluation Criteria:**

1. **Brevity (0-10)**: Is it under 150 words? Shorter is better. Deduct points for every 20 words over 150.

2. **Hospital-Specific Evidence (0-10)**: Does it reference SPECIFIC facts from the hospital report (SEP-1 scores, mortality rates, quality grading, recent news, publications, stakeholder initiatives, KPIs)? Generic emails score 0-3. Emails without any hospital-specific facts score 0.

3. **Healthcare Language (0-10)**: Does it use appropriate clinical terminology? Does it say \"patients\" not \"customers\"? Deduct 5 points for using \"customer.\"

4. **Directness (0-10)**: Does it get to the point immediately? First sentence should state the problem or value. No preamble.

5. **Data-Driven (0-10)**: Does it include specific metrics (NPV, TAT, mortality reduction, cost savings)? Generic claims score low.

6. **Clear CTA (0-10)**: Is the call to action simple and specific? \"15-minute call to discuss your sepsis metrics\" scores higher than \"let's connect.\"

7. **Role Relevance (0-10)**: Is the message tailored to this stakeholder's specific role and priorities? Generic emails score 0-3.

Provide your evaluation as JSON:
{
    \"brevity\": <score>,
    \"hospital_specific_evidence\": <score>,
    \"healthcare_language\": <score>,
    \"directness\": <score>,
    \"data_driven\": <score>,
    \"clear_cta\": <score>,
    \"role_relevance\": <score>,
    \"strengths\": [\"strength 1\", \"strength 2\"],
    \"weaknesses\": [\"weakness 1\", \"weakness 2\"],
    \"improvement_suggestions\": \"Specific suggestions for improvement\"
}

Return ONLY the JSON, no additional text.",
    &["subject", "body", "email_style"],
);

pub const REFINEMENT_PROMPT: PromptTemplate<'static> = PromptTemplate::new(
    "refinement",
    concat!(
        "You are a professional cold email expert. Refine this email based on evaluation feedback to make it a high-performing cold email.

Original Email:
Subject: {subject}
Body: {body}

Evaluation Feedback:
Overall Score: {overall_score}/10
Weaknesses: {weaknesses}
Improvement Suggestions: {improvement_suggestions}

Email Style: {email_style}

Stakeholder Context:
Name: {stakeholder_name}
Title: {stakeholder_title}

**Refinement Priorities:**
1. **Cut ruthlessly**: Remove any sentence that doesn't add direct value
2. **Add hospital-specific evidence**: Reference at least ONE concrete fact from the hospital report
3. **Use healthcare language**: Replace \"customer\" with \"patient\" if present
4. **Lead with value**: First sentence should reference a specific hospital fact or challenge
5. **Include data**: Add 1-2 specific IntelliSep metrics if missing
6. **Strengthen CTA**: Make the next step clear and simple
7. **Target under 150 words**: Ideally 100-120 words

",
        email_json_footer!(
            "Refined email subject line (under 60 characters)",
            "Refined email body (under 150 words)"
        )
    ),
    &[
        "subject",
        "body",
        "overall_score",
        "weaknesses",
        "improvement_suggestions",
        "email_style",
        "stakeholder_name",
        "stakeholder_title",
    ],
);

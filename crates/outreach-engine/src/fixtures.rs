//! Shared test data and mock replies.

use std::sync::Arc;

use outreach_llm::{MockProvider, MockReply, MockRoute};
use serde_json::json;

use crate::prompts::system;
use crate::reference::ReferenceMaterial;
use crate::strategy::test_support::ROLE_LIBRARY;

pub const SAMPLE_REPORT: &str = "TechCorp Solutions: Customer Research Report

TechCorp Solutions is a mid-sized health system operating three hospitals in the Midwest.
SEP-1 bundle compliance fell to 52% last quarter and sepsis mortality is above the state average.

Key stakeholders:
- Dr. Jane Smith, CTO. Leads the EHR migration and owns clinical decision support tooling.
- Michael Chen, VP of Product. Runs the patient-flow program and ED throughput dashboards.
";

pub const SAMPLE_SUMMARY: &str = "TechCorp Solutions: A mid-sized health system with three hospitals. SEP-1 compliance is 52% and leadership is prioritizing sepsis outcomes.";

pub const JANE: &str = "Dr. Jane Smith";
pub const MICHAEL: &str = "Michael Chen";

pub fn roster_reply() -> MockReply {
    MockReply::json(&json!([
        { "name": JANE, "title": "CTO", "details": "Leads the EHR migration" },
        { "name": MICHAEL, "title": "VP of Product", "details": "Runs the patient-flow program" }
    ]))
}

pub fn draft_reply(subject: &str, body: &str) -> MockReply {
    MockReply::json(&json!({ "subject": subject, "body": body }))
}

pub fn evaluation_reply(scores: [f64; 7]) -> MockReply {
    MockReply::json(&json!({
        "brevity": scores[0],
        "hospital_specific_evidence": scores[1],
        "healthcare_language": scores[2],
        "directness": scores[3],
        "data_driven": scores[4],
        "clear_cta": scores[5],
        "role_relevance": scores[6],
        "strengths": ["cites SEP-1"],
        "weaknesses": ["too long"],
        "improvement_suggestions": "Trim the second paragraph."
    }))
}

/// Averages to 8.6.
pub const PASSING_SCORES: [f64; 7] = [9.0, 8.0, 9.0, 8.0, 9.0, 8.0, 9.2];

/// Context extraction route for one stakeholder.
pub fn context_route(name: &str, excerpt: &str) -> MockRoute {
    MockRoute::when([system::RESEARCH.to_string(), format!("Name: {name}")]).always(MockReply::text(excerpt))
}

/// AI-style draft route for one stakeholder.
pub fn ai_draft_route(name: &str, subject: &str, body: &str) -> MockRoute {
    MockRoute::when([system::AI_STYLE.to_string(), format!("Name: {name}")]).always(draft_reply(subject, body))
}

/// Evaluation route keyed by the draft subject.
pub fn evaluation_route(subject: &str, scores: [f64; 7]) -> MockRoute {
    MockRoute::when([system::EVALUATION.to_string(), format!("Subject: {subject}\n")])
        .always(evaluation_reply(scores))
}

pub fn reference() -> Arc<ReferenceMaterial> {
    Arc::new(ReferenceMaterial::new("IntelliSep: 97.5% NPV, results in under 10 minutes.", ROLE_LIBRARY))
}

pub fn routed(routes: Vec<MockRoute>) -> Arc<MockProvider> {
    Arc::new(MockProvider::routed(routes))
}

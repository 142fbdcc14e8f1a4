use std::sync::Arc;

use tracing::{debug, instrument};

use outreach_core::errors::CompletionError;
use outreach_core::messages::framed;
use outreach_core::prompt::PromptValues;
use outreach_core::provider::{CompletionOptions, CompletionProvider};
use outreach_core::task::Stakeholder;

use crate::prompts::research::CONTEXT_EXTRACTION_PROMPT;
use crate::prompts::system;

/// Pulls the report passages relevant to one stakeholder.
///
/// The whole report is sent on every call; nothing is truncated client side.
/// An empty excerpt is a valid answer and is distinct from an `Err`.
#[derive(Clone)]
pub struct ContextExtractor {
    provider: Arc<dyn CompletionProvider>,
    options: CompletionOptions,
}

impl ContextExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>, options: CompletionOptions) -> Self {
        Self { provider, options }
    }

    #[instrument(skip_all, fields(stakeholder = %stakeholder.name))]
    pub async fn extract(&self, stakeholder: &Stakeholder, report: &str) -> Result<String, CompletionError> {
        let values = PromptValues::new()
            .with("stakeholder_name", stakeholder.name.as_str())
            .with("stakeholder_title", stakeholder.title.as_str())
            .with("stakeholder_details", stakeholder.details.as_str())
            .with("report", report);
        let prompt = CONTEXT_EXTRACTION_PROMPT
            .render(&values)
            .map_err(|e| CompletionError::InvalidRequest(e.to_string()))?;

        let excerpt = self
            .provider
            .complete(&framed(system::RESEARCH, prompt), &self.options)
            .await?;
        let excerpt = excerpt.trim().to_string();
        debug!(chars = excerpt.len(), "context extracted");
        Ok(excerpt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_llm::{MockProvider, MockReply};

    fn jane() -> Stakeholder {
        Stakeholder::new("Dr. Jane Smith", "CTO", "Leads the EHR migration")
    }

    #[tokio::test]
    async fn sends_identity_and_full_report() {
        let report = format!("TechCorp report. {}", "x".repeat(50_000));
        let mock = Arc::new(MockProvider::new(vec![MockReply::text("  Jane leads the EHR migration.\n")]));
        let extractor = ContextExtractor::new(mock.clone(), CompletionOptions::default());

        let excerpt = extractor.extract(&jane(), &report).await.unwrap();
        assert_eq!(excerpt, "Jane leads the EHR migration.");

        let call = &mock.calls()[0];
        assert_eq!(call[0].content, system::RESEARCH);
        assert!(call[1].content.contains("Name: Dr. Jane Smith"));
        assert!(call[1].content.contains("Details: Leads the EHR migration"));
        assert!(call[1].content.contains(&report));
    }

    #[tokio::test]
    async fn empty_answer_is_not_an_error() {
        let mock = Arc::new(MockProvider::new(vec![MockReply::text("   ")]));
        let extractor = ContextExtractor::new(mock, CompletionOptions::default());
        assert_eq!(extractor.extract(&jane(), "report").await.unwrap(), "");
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced() {
        let mock = Arc::new(MockProvider::new(vec![MockReply::Error(CompletionError::ProviderOverloaded)]));
        let extractor = ContextExtractor::new(mock, CompletionOptions::default());
        assert!(matches!(
            extractor.extract(&jane(), "report").await,
            Err(CompletionError::ProviderOverloaded)
        ));
    }
}

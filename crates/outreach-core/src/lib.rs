//! Domain types and shared plumbing for the stakeholder outreach pipeline.
//!
//! Everything here is synchronous except the [`provider::CompletionProvider`]
//! seam, which the engine awaits for every model call.

pub mod email;
pub mod errors;
pub mod ids;
pub mod json;
pub mod messages;
pub mod prompt;
pub mod provider;
pub mod store;
pub mod task;

pub use email::{DraftError, EmailDraft, EmailRecord, Evaluation, RecordOutcome, RubricScores};
pub use errors::CompletionError;
pub use ids::{RunId, TaskId};
pub use json::{recover_json, JsonRecoveryError, JsonShape};
pub use messages::{ChatMessage, Role};
pub use prompt::{PromptError, PromptTemplate, PromptValues};
pub use provider::{CompletionOptions, CompletionProvider};
pub use store::{InMemoryTemplateStore, LookupError, TemplateStore};
pub use task::{CompanySummary, GenerationMode, GenerationTask, ModeConfig, Stakeholder, TemplateSource};

//! SQLite persistence for saved email prompt templates.

pub mod database;
pub mod error;
pub mod schema;
pub mod templates;

pub use database::Database;
pub use error::StoreError;
pub use templates::{TemplateRepo, TemplateRow};

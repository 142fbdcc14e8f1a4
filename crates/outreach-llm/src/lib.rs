pub mod converter;
pub mod openrouter;
pub mod reliable;

pub mod mock;

pub use mock::{MockProvider, MockReply, MockRoute};
pub use openrouter::{ApiKey, OpenRouterConfig, OpenRouterProvider};
pub use reliable::{ReliableConfig, ReliableProvider};

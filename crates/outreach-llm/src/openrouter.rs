use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};

use outreach_core::errors::CompletionError;
use outreach_core::messages::ChatMessage;
use outreach_core::provider::{CompletionOptions, CompletionProvider};

use crate::converter;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Wraps an API key so it is zeroized on drop and redacted in Debug.
#[derive(Clone)]
pub struct ApiKey(pub SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[derive(Clone, Debug)]
pub struct OpenRouterConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    /// Sent as `X-Title` so usage shows up under the app name on the dashboard.
    pub app_title: Option<String>,
}

impl OpenRouterConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(120),
            app_title: Some("outreach".to_string()),
        }
    }
}

/// Chat-completions client for OpenRouter or any OpenAI-compatible endpoint.
pub struct OpenRouterProvider {
    client: Client,
    config: OpenRouterConfig,
    endpoint: String,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CompletionError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_send_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.config.request_timeout)
        } else {
            CompletionError::NetworkError(e.to_string())
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, messages, options), fields(model = %self.config.model, max_tokens = options.max_tokens))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let body = converter::build_request_body(messages, options, &self.config.model);

        let mut req = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.0.expose_secret()),
            )
            .header("content-type", "application/json");
        if let Some(title) = &self.config.app_title {
            req = req.header("X-Title", title);
        }

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status, body));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;
        let text = converter::extract_text(&payload)?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_properties() {
        let provider = OpenRouterProvider::new(OpenRouterConfig::new(ApiKey::new("test-key"))).unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.model(), DEFAULT_MODEL);
        assert_eq!(provider.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn trailing_slash_in_base_url() {
        let mut config = OpenRouterConfig::new(ApiKey::new("k"));
        config.base_url = "http://localhost:8080/v1/".into();
        config.model = "local/llama".into();
        let provider = OpenRouterProvider::new(config).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(provider.model(), "local/llama");
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-or-secret");
        let debug = format!("{key:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let mut config = OpenRouterConfig::new(ApiKey::new("k"));
        config.base_url = "http://127.0.0.1:9".into();
        config.request_timeout = Duration::from_secs(2);
        let provider = OpenRouterProvider::new(config).unwrap();
        let err = provider
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
